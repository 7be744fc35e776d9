//! Deterministic item naming for each sale window.

/// Item name and image URL for the sale identified by the schedule-derived
/// id. Deterministic so retried rotations regenerate identical metadata.
pub fn generate_item(scheduled_sale_id: i32) -> (String, String) {
    let item_name = format!("LIMITED-ITEM-{scheduled_sale_id}");
    let image_url = format!("https://via.placeholder.com/150?text={item_name}");
    (item_name, image_url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_is_deterministic() {
        assert_eq!(generate_item(20261301), generate_item(20261301));
    }

    #[test]
    fn test_item_embeds_sale_id() {
        let (item_name, image_url) = generate_item(20261301);
        assert_eq!(item_name, "LIMITED-ITEM-20261301");
        assert!(image_url.contains(&item_name));
    }
}
