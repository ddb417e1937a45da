//! Delivery channel data model.

/// One registered destination for newsletter notifications.
///
/// Several internal subscriptions may point at the same physical
/// destination; `external_id` is the deduplication key and fan-out
/// delivers at most once per distinct value.
#[derive(Debug, Clone)]
pub struct DeliveryChannel {
    /// Unique identifier.
    pub id: Option<i64>,
    /// Owning user.
    pub user_id: i64,
    /// Identifier of the physical destination (e.g., the workspace
    /// channel id); shared by duplicate registrations.
    pub external_id: String,
    /// Webhook endpoint notifications are posted to.
    pub endpoint: String,
    /// Human-readable label of the destination tenant (e.g., the
    /// workspace name), used in notification links.
    pub tenant_label: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_construction() {
        let channel = DeliveryChannel {
            id: None,
            user_id: 1,
            external_id: "C042".to_string(),
            endpoint: "https://hooks.example/T1/B1".to_string(),
            tenant_label: "acme".to_string(),
        };
        assert_eq!(channel.external_id, "C042");
    }
}
