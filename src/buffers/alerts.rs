use std::collections::VecDeque;

use crate::Alert;

// ---

/// Capped alert list, most recent first.
#[derive(Debug, Clone)]
pub struct AlertBuffer {
    alerts: VecDeque<Alert>,
    capacity: usize,
}

impl AlertBuffer {
    /// Create an empty buffer holding at most `capacity` alerts (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            alerts: VecDeque::new(),
            capacity,
        }
    }

    /// Insert at the head, evicting from the tail past capacity.
    pub fn append(&mut self, alert: Alert) {
        // ---
        self.alerts.push_front(alert);
        self.alerts.truncate(self.capacity);
    }

    /// Remove the alert with `id`. Returns `false` if there was none.
    pub fn dismiss(&mut self, id: u64) -> bool {
        // ---
        match self.alerts.iter().position(|a| a.id == id) {
            Some(index) => {
                self.alerts.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn head(&self) -> Option<&Alert> {
        self.alerts.front()
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter()
    }

    pub fn to_vec(&self) -> Vec<Alert> {
        self.alerts.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::Severity;
    use chrono::Utc;

    fn alert(id: u64) -> Alert {
        Alert {
            id,
            alert_type: None,
            message: format!("alert #{id}"),
            severity: Severity::Warning,
            timestamp: Utc::now(),
            temperature: 30.0,
            humidity: 40.0,
        }
    }

    fn ids(buffer: &AlertBuffer) -> Vec<u64> {
        buffer.iter().map(|a| a.id).collect()
    }

    #[test]
    fn test_append_is_most_recent_first() {
        // ---
        let mut buffer = AlertBuffer::new(3);
        buffer.append(alert(1));
        buffer.append(alert(2));

        assert_eq!(ids(&buffer), vec![2, 1]);
        assert_eq!(buffer.head().map(|a| a.id), Some(2));
    }

    #[test]
    fn test_overflow_evicts_tail() {
        // ---
        let capacity = 3;
        for extra in 0..5u64 {
            let mut buffer = AlertBuffer::new(capacity);
            let total = capacity as u64 + extra;
            for id in 1..=total {
                buffer.append(alert(id));
            }
            assert_eq!(buffer.len(), capacity);
            assert_eq!(buffer.head().map(|a| a.id), Some(total));
            assert_eq!(ids(&buffer), vec![total, total - 1, total - 2]);
        }
    }

    #[test]
    fn test_dismiss_removes_exactly_one() {
        // ---
        let mut buffer = AlertBuffer::new(3);
        for id in 1..=3 {
            buffer.append(alert(id));
        }

        assert!(buffer.dismiss(2));
        assert_eq!(ids(&buffer), vec![3, 1]);

        // Already gone
        assert!(!buffer.dismiss(2));
        assert_eq!(ids(&buffer), vec![3, 1]);
    }

    #[test]
    fn test_dismiss_unknown_id_is_noop() {
        // ---
        let mut buffer = AlertBuffer::new(2);
        buffer.append(alert(10));
        let before = buffer.to_vec();

        assert!(!buffer.dismiss(99));
        assert_eq!(buffer.to_vec(), before);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        // ---
        let mut buffer = AlertBuffer::new(0);
        buffer.append(alert(1));
        buffer.append(alert(2));
        assert_eq!(buffer.capacity(), 1);
        assert_eq!(ids(&buffer), vec![2]);
    }

    #[test]
    fn test_huge_capacity_grows_on_demand() {
        // ---
        let mut buffer = AlertBuffer::new(usize::MAX);
        buffer.append(alert(1));
        assert_eq!(buffer.capacity(), usize::MAX);
        assert_eq!(ids(&buffer), vec![1]);
    }
}
