// ===============================
// src/chart.rs
// ===============================
//
// Bounded trend history for the risk chart.
// - RingBuffer<T> : fixed capacity FIFO; the oldest element is evicted before
//                   an insert that would exceed capacity. Never reorders.
// - ChartSeries   : (label, risk %, |pnl %|) triples, exposed to the chart
//                   widget as three parallel arrays of equal length.
//

use std::collections::VecDeque;

use crate::domain::ChartSnapshot;

pub const DEFAULT_CAPACITY: usize = 20;

#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    items: VecDeque<T>,
    cap: usize,
}

impl<T> RingBuffer<T> {
    /// Capacity below 1 is raised to 1.
    pub fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        Self { items: VecDeque::with_capacity(cap), cap }
    }

    pub fn push(&mut self, item: T) {
        if self.items.len() == self.cap {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.items.iter()
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ChartPoint {
    label: String,
    risk: f64,
    pnl: f64,
}

#[derive(Debug, Clone)]
pub struct ChartSeries {
    points: RingBuffer<ChartPoint>,
}

impl Default for ChartSeries {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ChartSeries {
    pub fn new(cap: usize) -> Self {
        Self { points: RingBuffer::new(cap) }
    }

    pub fn push(&mut self, label: impl Into<String>, risk_percent: f64, abs_pnl_percent: f64) {
        self.points.push(ChartPoint {
            label: label.into(),
            risk: risk_percent,
            pnl: abs_pnl_percent,
        });
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn snapshot(&self) -> ChartSnapshot {
        let n = self.points.len();
        let mut snap = ChartSnapshot {
            labels: Vec::with_capacity(n),
            risk: Vec::with_capacity(n),
            pnl: Vec::with_capacity(n),
        };
        for p in self.points.iter() {
            snap.labels.push(p.label.clone());
            snap.risk.push(p.risk);
            snap.pnl.push(p.pnl);
        }
        snap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_exceeds_capacity_and_keeps_most_recent() {
        let mut rb = RingBuffer::new(20);
        for i in 0..57 {
            rb.push(i);
            assert!(rb.len() <= 20);
        }
        let kept: Vec<_> = rb.iter().copied().collect();
        assert_eq!(kept, (37..57).collect::<Vec<_>>());
    }

    #[test]
    fn below_capacity_nothing_is_evicted() {
        let mut rb = RingBuffer::new(3);
        rb.push("a");
        rb.push("b");
        assert_eq!(rb.iter().copied().collect::<Vec<_>>(), ["a", "b"]);
        rb.push("c");
        rb.push("d");
        assert_eq!(rb.iter().copied().collect::<Vec<_>>(), ["b", "c", "d"]);
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let mut rb = RingBuffer::new(0);
        rb.push(1);
        rb.push(2);
        assert_eq!(rb.capacity(), 1);
        assert_eq!(rb.iter().copied().collect::<Vec<_>>(), [2]);
    }

    #[test]
    fn series_stay_parallel() {
        let mut series = ChartSeries::new(DEFAULT_CAPACITY);
        for i in 0..25 {
            series.push(format!("10:{i:02}"), i as f64, (i as f64) / 10.0);
        }
        let snap = series.snapshot();
        assert_eq!(snap.labels.len(), 20);
        assert_eq!(snap.risk.len(), 20);
        assert_eq!(snap.pnl.len(), 20);
        assert_eq!(snap.labels.first().map(String::as_str), Some("10:05"));
        assert_eq!(snap.risk.last(), Some(&24.0));
        assert_eq!(snap.pnl.first(), Some(&0.5));
    }
}
