//! Builds the schema.org objects attached to each record's structured data.

use serde_json::{json, Value};

/// The answer attached to every FAQ question. Answers are not extracted from
/// post content.
pub const FAQ_ANSWER: &str =
    "Read the full review above for a detailed answer, including pricing, features and alternatives.";

/// A rating attached to a review.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub value: f64,
    pub review_count: u32,
}

pub struct Subject<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub url: &'a str,
    pub image: &'a str,
    pub author: &'a str,
    pub pros: &'a [String],
    pub cons: &'a [String],
    pub rating: Option<Rating>,
}

pub fn review(subject: &Subject) -> Value {
    let mut review = json!({
        "@context": "https://schema.org",
        "@type": "Review",
        "name": subject.name,
        "url": subject.url,
        "itemReviewed": {
            "@type": "SoftwareApplication",
            "name": subject.name,
            "applicationCategory": "BusinessApplication",
        },
        "author": { "@type": "Organization", "name": subject.author },
        "positiveNotes": item_list(subject.pros),
        "negativeNotes": item_list(subject.cons),
    });
    if let Some(rating) = subject.rating {
        review["reviewRating"] = json!({
            "@type": "Rating",
            "ratingValue": rating.value,
            "bestRating": 5,
            "worstRating": 1,
        });
    }
    review
}

pub fn product(subject: &Subject) -> Value {
    let mut product = json!({
        "@context": "https://schema.org",
        "@type": "Product",
        "name": subject.name,
        "description": subject.description,
        "image": subject.image,
        "url": subject.url,
    });
    if let Some(rating) = subject.rating {
        product["aggregateRating"] = json!({
            "@type": "AggregateRating",
            "ratingValue": rating.value,
            "reviewCount": rating.review_count,
        });
    }
    product
}

/// An FAQPage object, one question per entry.
pub fn faq(questions: &[String]) -> Value {
    json!({
        "@context": "https://schema.org",
        "@type": "FAQPage",
        "mainEntity": questions
            .iter()
            .map(|question| json!({
                "@type": "Question",
                "name": question,
                "acceptedAnswer": { "@type": "Answer", "text": FAQ_ANSWER },
            }))
            .collect::<Vec<Value>>(),
    })
}

fn item_list(items: &[String]) -> Value {
    json!({
        "@type": "ItemList",
        "itemListElement": items
            .iter()
            .enumerate()
            .map(|(i, item)| json!({
                "@type": "ListItem",
                "position": i + 1,
                "name": item,
            }))
            .collect::<Vec<Value>>(),
    })
}
