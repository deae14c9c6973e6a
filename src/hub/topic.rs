/// The fixed set of topics the bridge subscribes to.
///
/// Order of first appearance is kept and duplicates are dropped. The set is
/// built once from configuration and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionSet {
    topics: Vec<String>,
}

impl SubscriptionSet {
    pub fn new<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for topic in topics {
            let topic = topic.into();
            if !topic.is_empty() && !unique.contains(&topic) {
                unique.push(topic);
            }
        }
        Self { topics: unique }
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.topics.iter().any(|t| t == topic)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.topics.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

impl From<Vec<String>> for SubscriptionSet {
    fn from(topics: Vec<String>) -> Self {
        Self::new(topics)
    }
}

impl Default for SubscriptionSet {
    /// The status channels published by the field controller.
    fn default() -> Self {
        Self::new(["Camera_status", "AC_status", "DC_status"])
    }
}
