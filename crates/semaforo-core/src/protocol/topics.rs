//! Topics that trigger a signal cycle.

/// Both spellings are accepted; older panels publish the reversed form.
pub const TRIGGER_TOPICS: [&str; 2] = ["semaforo/acao", "acao/semaforo"];

/// Returns `true` if a publish to `topic` should start a cycle.
///
/// Matching is exact: no wildcards, no case folding, no trimming.
pub fn is_trigger_topic(topic: &str) -> bool {
    TRIGGER_TOPICS.contains(&topic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_trigger_topics_match() {
        assert!(is_trigger_topic("semaforo/acao"));
        assert!(is_trigger_topic("acao/semaforo"));
    }

    #[test]
    fn test_other_topics_do_not_match() {
        assert!(!is_trigger_topic("semaforo/status"));
        assert!(!is_trigger_topic("SEMAFORO/ACAO"));
        assert!(!is_trigger_topic("semaforo/acao/"));
        assert!(!is_trigger_topic(""));
    }
}
