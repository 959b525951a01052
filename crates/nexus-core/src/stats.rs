//! Dashboard statistics over a lead collection.
//!
//! These are pure computations, usually fed the result of
//! `CacheManager::merge` so that figures reflect remote data without
//! committing a sync.

use crate::models::{Lead, LeadStatus};

/// Share of leads in one pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusShare {
    pub status: LeadStatus,
    pub count: usize,
    /// Rounded percentage of all leads.
    pub percent: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadStats {
    pub total: usize,
    pub predicted_revenue: f64,
    pub active: usize,
    pub sold: usize,
    pub expired: usize,
    /// Rounded percentage of leads won, 0 when there are no leads.
    pub conversion: u32,
    /// Non-empty stages in pipeline order.
    pub breakdown: Vec<StatusShare>,
}

impl LeadStats {
    pub fn from_leads(leads: &[Lead]) -> Self {
        let total = leads.len();
        let count = |pred: fn(LeadStatus) -> bool| leads.iter().filter(|l| pred(l.status)).count();

        let sold = count(|s| s == LeadStatus::Won);
        let breakdown = LeadStatus::ALL
            .iter()
            .filter_map(|status| {
                let n = leads.iter().filter(|l| l.status == *status).count();
                (n > 0).then(|| StatusShare {
                    status: *status,
                    count: n,
                    percent: percent(n, total),
                })
            })
            .collect();

        Self {
            total,
            predicted_revenue: leads.iter().map(|l| l.estimated_value).sum(),
            active: count(LeadStatus::is_active),
            sold,
            expired: count(LeadStatus::is_closed_lost),
            conversion: percent(sold, total),
            breakdown,
        }
    }
}

fn percent(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((part as f64 / total as f64) * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lead(id: &str, status: LeadStatus, value: f64) -> Lead {
        let mut lead = Lead::new(id, id, "2024-01-01");
        lead.status = status;
        lead.estimated_value = value;
        lead
    }

    #[test]
    fn test_empty_stats() {
        let stats = LeadStats::from_leads(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.conversion, 0);
        assert!(stats.breakdown.is_empty());
    }

    #[test]
    fn test_stats_counts() {
        let leads = vec![
            lead("a", LeadStatus::New, 100.0),
            lead("b", LeadStatus::Proposal, 250.0),
            lead("c", LeadStatus::Won, 1000.0),
            lead("d", LeadStatus::Lost, 0.0),
            lead("e", LeadStatus::Expired, 50.0),
            lead("f", LeadStatus::Won, 10.0),
        ];
        let stats = LeadStats::from_leads(&leads);

        assert_eq!(stats.total, 6);
        assert_eq!(stats.predicted_revenue, 1410.0);
        assert_eq!(stats.active, 2);
        assert_eq!(stats.sold, 2);
        assert_eq!(stats.expired, 2);
        assert_eq!(stats.conversion, 33);

        let stages: Vec<_> = stats.breakdown.iter().map(|s| (s.status, s.percent)).collect();
        assert_eq!(
            stages,
            vec![
                (LeadStatus::New, 17),
                (LeadStatus::Proposal, 17),
                (LeadStatus::Won, 33),
                (LeadStatus::Lost, 17),
                (LeadStatus::Expired, 17),
            ]
        );
    }
}
