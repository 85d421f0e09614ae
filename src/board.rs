use crate::models::{BoardSnapshot, ChartView, LinkStatus, Subject, SubjectId};
use crate::multiplexer::ChartSink;
use chrono::Local;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// The charts as they were last painted, read by the HTTP handlers.
#[derive(Debug)]
pub struct ChartBoard {
    status: LinkStatus,
    updated_at: Option<String>,
    charts: Vec<ChartView>,
}

impl Default for ChartBoard {
    fn default() -> Self {
        Self {
            status: LinkStatus::Connecting,
            updated_at: None,
            charts: Vec::new(),
        }
    }
}

impl ChartBoard {
    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            status: self.status.clone(),
            updated_at: self.updated_at.clone(),
            charts: self.charts.clone(),
        }
    }

    pub fn chart(&self, id: &SubjectId) -> Option<&ChartView> {
        self.charts.iter().find(|chart| &chart.id == id)
    }

    pub fn status(&self) -> &LinkStatus {
        &self.status
    }

    fn touch(&mut self) {
        self.updated_at = Some(Local::now().format("%Y-%m-%d %H:%M:%S").to_string());
    }
}

/// Cloneable handle that the multiplexer paints into while handlers read it.
#[derive(Clone, Default)]
pub struct SharedBoard {
    inner: Arc<Mutex<ChartBoard>>,
}

impl SharedBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the board. A panic elsewhere cannot leave a chart half painted,
    /// so a poisoned lock is still safe to read.
    pub fn lock(&self) -> MutexGuard<'_, ChartBoard> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        self.lock().snapshot()
    }
}

impl ChartSink for SharedBoard {
    fn paint(&mut self, subject: &SubjectId, labels: &[String], values: &[f64]) {
        let mut board = self.lock();
        if let Some(chart) = board.charts.iter_mut().find(|chart| &chart.id == subject) {
            chart.labels = labels.to_vec();
            chart.values = values.to_vec();
        }
        board.touch();
    }

    fn layout(&mut self, subjects: &[&Subject]) {
        let mut board = self.lock();
        let previous = std::mem::take(&mut board.charts);
        board.charts = subjects
            .iter()
            .map(|subject| {
                let (labels, values) = previous
                    .iter()
                    .find(|chart| chart.id == subject.id)
                    .map(|chart| (chart.labels.clone(), chart.values.clone()))
                    .unwrap_or_default();
                ChartView {
                    id: subject.id.clone(),
                    kind: subject.kind.clone(),
                    unit: subject.unit.clone(),
                    address: subject.address.clone(),
                    labels,
                    values,
                }
            })
            .collect();
        board.touch();
    }

    fn status(&mut self, status: LinkStatus) {
        let mut board = self.lock();
        board.status = status;
        board.touch();
    }
}
