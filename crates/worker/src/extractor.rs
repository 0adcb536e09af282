use async_trait::async_trait;
use chrono::{DateTime, Utc};
use home_inventory_queue::ReceiptUpload;
use home_inventory_shared::{ItemCategory, ReceiptItemInput, Unit};

/// Everything a `submitJobResult` call needs, produced from a claimed
/// receipt's raw OCR text or image.
#[derive(Debug, Clone, Default)]
pub struct ExtractedReceipt {
    pub merchant_name: Option<String>,
    pub purchased_at: Option<DateTime<Utc>>,
    pub items: Vec<ReceiptItemInput>,
    pub notes: Option<String>,
}

/// The extractor contract: turn a claimed receipt's raw OCR text or
/// image into line items the ledger can apply. A worker holds one
/// implementation and calls it once per claimed job.
#[async_trait]
pub trait ReceiptExtractor: Send + Sync {
    async fn extract(&self, receipt: &ReceiptUpload) -> anyhow::Result<ExtractedReceipt>;
}

fn guess_category(name: &str) -> ItemCategory {
    let n = name.to_lowercase();
    let hit = |words: &[&str]| words.iter().any(|w| n.contains(w));
    if hit(&["chicken", "beef", "pork", "fish", "egg", "tofu", "turkey"]) {
        ItemCategory::Protein
    } else if hit(&["milk", "cheese", "yogurt", "butter", "cream"]) {
        ItemCategory::Dairy
    } else if hit(&["apple", "banana", "lettuce", "tomato", "onion", "carrot", "potato", "pepper"]) {
        ItemCategory::Produce
    } else if hit(&["rice", "pasta", "bread", "cereal", "oat", "flour"]) {
        ItemCategory::Grain
    } else if hit(&["juice", "soda", "water", "coffee", "tea", "beer", "wine"]) {
        ItemCategory::Beverage
    } else if hit(&["frozen"]) {
        ItemCategory::Frozen
    } else if hit(&["chips", "cookie", "candy", "cracker", "chocolate"]) {
        ItemCategory::Snack
    } else if hit(&["sauce", "ketchup", "mustard", "oil", "vinegar", "spice", "salt"]) {
        ItemCategory::Condiment
    } else if hit(&["soap", "paper", "detergent", "towel", "tissue"]) {
        ItemCategory::Household
    } else {
        ItemCategory::Other
    }
}

fn item_key(normalized: &str) -> String {
    normalized
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect::<String>()
}

fn parse_line(raw: &str) -> Option<ReceiptItemInput> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let mut parts = raw.split_whitespace();
    let first = parts.next()?;
    let (quantity, rest): (f64, String) = match first.parse::<f64>() {
        Ok(q) => (q, parts.collect::<Vec<_>>().join(" ")),
        Err(_) => (1.0, raw.to_string()),
    };
    if rest.trim().is_empty() {
        return None;
    }
    let normalized = rest.trim().to_string();
    Some(ReceiptItemInput {
        item_key: item_key(&normalized),
        raw_name: raw.to_string(),
        normalized_name: normalized.clone(),
        quantity: quantity.max(0.01),
        unit: Unit::Count,
        category: guess_category(&normalized),
        unit_price: None,
    })
}

/// Reference `ReceiptExtractor`: splits `ocrText` into lines of the form
/// `<quantity> <item name>`, falling back to quantity 1 when no leading
/// number is present. No LLM calls; meant as the seed-demo / offline
/// default implementation of the extractor contract.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicExtractor;

#[async_trait]
impl ReceiptExtractor for HeuristicExtractor {
    async fn extract(&self, receipt: &ReceiptUpload) -> anyhow::Result<ExtractedReceipt> {
        let text = receipt
            .ocr_text
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("receipt {} has no ocrText to extract", receipt.receipt_upload_id))?;

        let items: Vec<ReceiptItemInput> = text.lines().filter_map(parse_line).collect();
        if items.is_empty() {
            anyhow::bail!("no parseable item lines in receipt {}", receipt.receipt_upload_id);
        }

        Ok(ExtractedReceipt {
            merchant_name: receipt.merchant_name.clone(),
            purchased_at: receipt.purchased_at,
            items,
            notes: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use home_inventory_shared::ReceiptStatus;

    fn receipt(ocr_text: Option<&str>) -> ReceiptUpload {
        ReceiptUpload {
            receipt_upload_id: "receipt_1".to_string(),
            household_id: "house_1".to_string(),
            filename: "r.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            storage_path: "receipts/house_1/receipt_1/r.jpg".to_string(),
            status: ReceiptStatus::Processing,
            created_at: "2026-02-01T00:00:00Z".parse().unwrap(),
            updated_at: "2026-02-01T00:00:00Z".parse().unwrap(),
            ocr_text: ocr_text.map(str::to_string),
            receipt_image_data_url: None,
            merchant_name: None,
            purchased_at: None,
            items: Vec::new(),
        }
    }

    #[tokio::test]
    async fn parses_quantity_prefixed_lines() {
        let extractor = HeuristicExtractor;
        let result = extractor
            .extract(&receipt(Some("2 whole milk\nchicken breast\n3 bananas")))
            .await
            .unwrap();
        assert_eq!(result.items.len(), 3);
        assert_eq!(result.items[0].quantity, 2.0);
        assert_eq!(result.items[0].category, ItemCategory::Dairy);
        assert_eq!(result.items[1].quantity, 1.0);
        assert_eq!(result.items[1].category, ItemCategory::Protein);
    }

    #[tokio::test]
    async fn errors_without_ocr_text() {
        let extractor = HeuristicExtractor;
        assert!(extractor.extract(&receipt(None)).await.is_err());
    }
}
