//! Routes samples from the shared push channel into one rolling window per
//! subject and repaints the matching chart after every change.
//!
//! The multiplexer owns the registry and every window. It is driven one
//! [`ChannelEvent`] at a time, so each mutation finishes before the next
//! event is looked at and no locking is needed around the registry.

use crate::errors::{ChannelError, DiscoveryError};
use crate::models::{LinkStatus, Sample, SampleBatch, Subject, SubjectId};
use crate::window::{Push, WINDOW_CAPACITY, Window};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use tracing::{debug, info, trace, warn};

/// Fetches the current subject list.
pub trait SubjectSource {
    fn discover(&self) -> impl Future<Output = Result<Vec<Subject>, DiscoveryError>> + Send;
}

/// Tells the remote source which subjects to push.
pub trait Announcer {
    fn announce(&mut self, ids: &[SubjectId]) -> Result<(), ChannelError>;
}

/// Where windows get drawn.
pub trait ChartSink {
    fn paint(&mut self, subject: &SubjectId, labels: &[String], values: &[f64]);

    /// Called with every registered subject, in discovery order, whenever the set changes.
    fn layout(&mut self, _subjects: &[&Subject]) {}

    fn status(&mut self, _status: LinkStatus) {}
}

#[derive(Debug)]
pub enum ChannelEvent {
    Opened,
    SampleBatch(SampleBatch),
    Error(ChannelError),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WindowHandle(SubjectId);

impl WindowHandle {
    pub fn id(&self) -> &SubjectId {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    Appended,
    Evicted,
    Duplicate,
    UnknownSubject,
}

struct Slot {
    subject: Subject,
    window: Window,
}

pub struct Multiplexer<S, A> {
    capacity: usize,
    order: Vec<SubjectId>,
    slots: HashMap<SubjectId, Slot>,
    sink: S,
    announcer: A,
    announcements: u64,
    announce_failed: bool,
}

impl<S: ChartSink, A: Announcer> Multiplexer<S, A> {
    pub fn new(sink: S, announcer: A) -> Self {
        Self::with_capacity(WINDOW_CAPACITY, sink, announcer)
    }

    pub fn with_capacity(capacity: usize, sink: S, announcer: A) -> Self {
        Self {
            capacity,
            order: Vec::new(),
            slots: HashMap::new(),
            sink,
            announcer,
            announcements: 0,
            announce_failed: false,
        }
    }

    pub async fn handle<D: SubjectSource>(&mut self, event: ChannelEvent, source: &D) {
        match event {
            ChannelEvent::Opened => self.on_channel_open(source).await,
            ChannelEvent::SampleBatch(batch) => self.on_sample_batch(&batch),
            ChannelEvent::Error(err) => self.on_channel_error(&err),
        }
    }

    /// Registers a subject and announces the full registered set. Registering
    /// a known id changes nothing and returns the existing handle.
    pub fn register_subject(&mut self, subject: Subject) -> WindowHandle {
        let (handle, added) = self.insert_subject(subject);
        if added {
            self.publish_layout();
            self.announce_all();
        }
        handle
    }

    /// Runs discovery and brings the registry in line with its result. The
    /// remote source forgets subscriptions across reconnects, so the full set
    /// is announced at least once per open.
    pub async fn on_channel_open<D: SubjectSource>(&mut self, source: &D) {
        info!("push channel open, discovering subjects");
        self.announce_failed = false;
        self.sink.status(LinkStatus::Discovering);

        match source.discover().await {
            Ok(subjects) => self.apply_discovery(subjects),
            Err(err) => {
                warn!("subject discovery failed: {err}");
                self.sink.status(LinkStatus::LoadFailed {
                    reason: err.to_string(),
                });
                self.announce_all();
            }
        }
    }

    pub fn on_sample(&mut self, id: &SubjectId, sample: &Sample) -> SampleOutcome {
        let Some(slot) = self.slots.get_mut(id) else {
            debug!("ignoring sample for unregistered subject {id}");
            return SampleOutcome::UnknownSubject;
        };

        let outcome = match slot.window.push(sample) {
            Push::Duplicate => {
                trace!("duplicate tick {} for subject {id}", sample.timestamp());
                return SampleOutcome::Duplicate;
            }
            Push::Appended => SampleOutcome::Appended,
            Push::Evicted => SampleOutcome::Evicted,
        };

        self.sink.paint(id, &slot.window.labels(), &slot.window.values());
        outcome
    }

    pub fn on_sample_batch(&mut self, batch: &SampleBatch) {
        for (id, sample) in &batch.entries {
            self.on_sample(id, sample);
        }
    }

    pub fn on_channel_error(&mut self, err: &ChannelError) {
        warn!("push channel error: {err}");
        self.sink.status(LinkStatus::ChannelDown {
            reason: err.to_string(),
        });
    }

    pub fn window(&self, handle: &WindowHandle) -> Option<&Window> {
        self.window_for(handle.id())
    }

    pub fn window_for(&self, id: &SubjectId) -> Option<&Window> {
        self.slots.get(id).map(|slot| &slot.window)
    }

    /// Registered ids in discovery order.
    pub fn subject_ids(&self) -> &[SubjectId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn announcements(&self) -> u64 {
        self.announcements
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn announcer(&self) -> &A {
        &self.announcer
    }

    /// Discovery announces once, after the whole list is registered: the
    /// remote source subscribes from the first announcement it reads.
    fn apply_discovery(&mut self, subjects: Vec<Subject>) {
        let discovered: HashSet<SubjectId> =
            subjects.iter().map(|subject| subject.id.clone()).collect();

        let mut relayout = false;
        if self.order.iter().any(|id| !discovered.contains(id)) {
            self.order.retain(|id| discovered.contains(id));
            self.slots.retain(|id, _| discovered.contains(id));
            relayout = true;
        }

        for subject in subjects {
            match self.slots.get_mut(&subject.id) {
                Some(slot) => {
                    if slot.subject != subject {
                        slot.subject = subject;
                        relayout = true;
                    }
                }
                None => {
                    self.insert_subject(subject);
                    relayout = true;
                }
            }
        }

        if relayout {
            self.publish_layout();
        }
        self.announce_all();

        info!("tracking {} subjects", self.order.len());
        if !self.announce_failed {
            self.sink.status(LinkStatus::Live {
                subjects: self.order.len(),
            });
        }
    }

    fn insert_subject(&mut self, subject: Subject) -> (WindowHandle, bool) {
        let handle = WindowHandle(subject.id.clone());
        if self.slots.contains_key(&subject.id) {
            return (handle, false);
        }

        debug!(
            "registering subject {} ({}, {})",
            subject.id, subject.kind, subject.unit
        );
        self.order.push(subject.id.clone());
        self.slots.insert(
            subject.id.clone(),
            Slot {
                subject,
                window: Window::new(self.capacity),
            },
        );
        (handle, true)
    }

    fn publish_layout(&mut self) {
        let subjects: Vec<&Subject> = self
            .order
            .iter()
            .filter_map(|id| self.slots.get(id).map(|slot| &slot.subject))
            .collect();
        self.sink.layout(&subjects);
    }

    fn announce_all(&mut self) {
        if self.order.is_empty() {
            return;
        }
        match self.announcer.announce(&self.order) {
            Ok(()) => {
                self.announcements += 1;
                debug!("announced {} subjects", self.order.len());
            }
            Err(err) => {
                warn!("failed to announce subjects: {err}");
                self.announce_failed = true;
                self.sink.status(LinkStatus::ChannelDown {
                    reason: err.to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        paints: Vec<(SubjectId, Vec<String>, Vec<f64>)>,
        layouts: Vec<Vec<SubjectId>>,
        statuses: Vec<LinkStatus>,
    }

    impl ChartSink for RecordingSink {
        fn paint(&mut self, subject: &SubjectId, labels: &[String], values: &[f64]) {
            self.paints
                .push((subject.clone(), labels.to_vec(), values.to_vec()));
        }

        fn layout(&mut self, subjects: &[&Subject]) {
            self.layouts
                .push(subjects.iter().map(|subject| subject.id.clone()).collect());
        }

        fn status(&mut self, status: LinkStatus) {
            self.statuses.push(status);
        }
    }

    #[derive(Default)]
    struct RecordingAnnouncer {
        sent: Vec<Vec<SubjectId>>,
        closed: bool,
    }

    impl Announcer for RecordingAnnouncer {
        fn announce(&mut self, ids: &[SubjectId]) -> Result<(), ChannelError> {
            if self.closed {
                return Err(ChannelError::Closed);
            }
            self.sent.push(ids.to_vec());
            Ok(())
        }
    }

    struct StaticSource(Option<Vec<Subject>>);

    impl SubjectSource for StaticSource {
        fn discover(&self) -> impl Future<Output = Result<Vec<Subject>, DiscoveryError>> + Send {
            let result = self.0.clone().ok_or(DiscoveryError::Unauthorized);
            async move { result }
        }
    }

    fn mux() -> Multiplexer<RecordingSink, RecordingAnnouncer> {
        Multiplexer::new(RecordingSink::default(), RecordingAnnouncer::default())
    }

    fn subject(id: &str) -> Subject {
        Subject::new(id, "Temperature", "Celsius")
    }

    fn ids(raw: &[&str]) -> Vec<SubjectId> {
        raw.iter().map(|id| SubjectId::new(*id)).collect()
    }

    fn tick(second: usize, value: f64) -> Sample {
        Sample::new(
            format!("2026-01-05 10:{:02}:{:02}", second / 60, second % 60),
            value,
        )
        .unwrap()
    }

    #[test]
    fn registration_is_idempotent() {
        let mut mux = mux();
        let first = mux.register_subject(subject("A"));
        mux.register_subject(subject("B"));
        let again = mux.register_subject(subject("A"));

        assert_eq!(first, again);
        assert_eq!(mux.subject_ids(), ids(&["A", "B"]).as_slice());
        assert_eq!(
            mux.announcer().sent,
            vec![ids(&["A"]), ids(&["A", "B"])]
        );
    }

    #[test]
    fn sample_for_one_subject_leaves_others_empty() {
        let mut mux = mux();
        let a = mux.register_subject(subject("A"));
        let b = mux.register_subject(subject("B"));

        let outcome = mux.on_sample(a.id(), &Sample::new("10:00:01", 5.0).unwrap());

        assert_eq!(outcome, SampleOutcome::Appended);
        let window_a = mux.window(&a).unwrap();
        assert_eq!(window_a.labels(), vec!["10:00:01"]);
        assert_eq!(window_a.values(), vec![5.0]);
        assert!(mux.window(&b).unwrap().is_empty());
        assert_eq!(
            mux.sink().paints,
            vec![(SubjectId::new("A"), vec!["10:00:01".to_string()], vec![5.0])]
        );
    }

    #[test]
    fn duplicate_tick_is_not_plotted() {
        let mut mux = mux();
        let a = mux.register_subject(subject("A"));
        mux.on_sample(a.id(), &Sample::new("12:00:00", 1.0).unwrap());

        let outcome = mux.on_sample(a.id(), &Sample::new("12:00:00", 2.0).unwrap());

        assert_eq!(outcome, SampleOutcome::Duplicate);
        assert_eq!(mux.window(&a).unwrap().values(), vec![1.0]);
        assert_eq!(mux.sink().paints.len(), 1);
    }

    #[test]
    fn twenty_first_sample_evicts_the_first() {
        let mut mux = mux();
        let a = mux.register_subject(subject("A"));

        for second in 1..=21 {
            mux.on_sample(a.id(), &tick(second, second as f64));
        }

        let window = mux.window(&a).unwrap();
        assert_eq!(window.len(), 20);
        assert_eq!(window.values()[0], 2.0);
        assert_eq!(window.labels()[0], "10:00:02");
        let last = mux.sink().paints.last().unwrap();
        assert_eq!(last.1.len(), 20);
        assert_eq!(last.2.len(), 20);
    }

    #[test]
    fn unknown_subject_is_ignored() {
        let mut mux = mux();
        let a = mux.register_subject(subject("A"));
        mux.on_sample(a.id(), &tick(1, 1.0));

        let outcome = mux.on_sample(&SubjectId::new("missing-id"), &tick(2, 9.0));

        assert_eq!(outcome, SampleOutcome::UnknownSubject);
        assert_eq!(mux.window(&a).unwrap().values(), vec![1.0]);
        assert!(mux.window_for(&SubjectId::new("missing-id")).is_none());
        assert_eq!(mux.sink().paints.len(), 1);
    }

    #[test]
    fn channel_error_leaves_windows_untouched() {
        let mut mux = mux();
        let a = mux.register_subject(subject("A"));
        mux.on_sample(a.id(), &tick(1, 1.0));

        mux.on_channel_error(&ChannelError::Transport("reset by peer".into()));

        assert_eq!(mux.window(&a).unwrap().values(), vec![1.0]);
        assert_eq!(mux.len(), 1);
        assert!(matches!(
            mux.sink().statuses.last(),
            Some(LinkStatus::ChannelDown { .. })
        ));
    }

    #[test]
    fn batch_applies_each_entry_in_order() {
        let mut mux = mux();
        mux.register_subject(subject("A"));
        mux.register_subject(subject("B"));
        let batch = SampleBatch {
            entries: vec![
                (SubjectId::new("A"), tick(1, 1.0)),
                (SubjectId::new("B"), tick(1, 7.0)),
                (SubjectId::new("A"), tick(1, 1.5)),
                (SubjectId::new("A"), tick(2, 2.0)),
            ],
            rejected: 0,
        };

        mux.on_sample_batch(&batch);

        assert_eq!(
            mux.window_for(&SubjectId::new("A")).unwrap().values(),
            vec![1.0, 2.0]
        );
        assert_eq!(
            mux.window_for(&SubjectId::new("B")).unwrap().values(),
            vec![7.0]
        );
    }

    #[tokio::test]
    async fn open_registers_discovered_subjects() {
        let mut mux = mux();
        let source = StaticSource(Some(vec![subject("1"), subject("2")]));

        mux.handle(ChannelEvent::Opened, &source).await;

        assert_eq!(mux.subject_ids(), ids(&["1", "2"]).as_slice());
        assert_eq!(mux.announcer().sent, vec![ids(&["1", "2"])]);
        assert_eq!(
            mux.sink().statuses.first(),
            Some(&LinkStatus::Discovering)
        );
        assert_eq!(
            mux.sink().statuses.last(),
            Some(&LinkStatus::Live { subjects: 2 })
        );
    }

    #[tokio::test]
    async fn reopen_reannounces_without_resetting_windows() {
        let mut mux = mux();
        let source = StaticSource(Some(vec![subject("1"), subject("2")]));
        mux.on_channel_open(&source).await;
        mux.on_sample(&SubjectId::new("1"), &tick(1, 1.0));
        let sent_before = mux.announcer().sent.len();

        mux.on_channel_open(&source).await;

        assert_eq!(mux.len(), 2);
        assert_eq!(mux.announcer().sent.len(), sent_before + 1);
        assert_eq!(mux.announcer().sent.last(), Some(&ids(&["1", "2"])));
        assert_eq!(
            mux.window_for(&SubjectId::new("1")).unwrap().values(),
            vec![1.0]
        );
    }

    #[tokio::test]
    async fn reload_drops_subjects_that_disappeared() {
        let mut mux = mux();
        mux.on_channel_open(&StaticSource(Some(vec![subject("1"), subject("2")])))
            .await;

        mux.on_channel_open(&StaticSource(Some(vec![subject("2")])))
            .await;

        assert_eq!(mux.subject_ids(), ids(&["2"]).as_slice());
        assert!(mux.window_for(&SubjectId::new("1")).is_none());
        assert_eq!(mux.announcer().sent.last(), Some(&ids(&["2"])));
        assert_eq!(mux.sink().layouts.last(), Some(&ids(&["2"])));
    }

    #[tokio::test]
    async fn discovery_failure_is_reported_as_load_failure() {
        let mut mux = mux();

        mux.on_channel_open(&StaticSource(None)).await;

        assert!(mux.is_empty());
        assert!(mux.announcer().sent.is_empty());
        assert!(matches!(
            mux.sink().statuses.last(),
            Some(LinkStatus::LoadFailed { .. })
        ));
    }

    #[tokio::test]
    async fn empty_discovery_announces_nothing() {
        let mut mux = mux();

        mux.on_channel_open(&StaticSource(Some(Vec::new()))).await;

        assert_eq!(mux.announcements(), 0);
        assert_eq!(mux.sink().statuses.last(), Some(&LinkStatus::Live { subjects: 0 }));
    }

    #[test]
    fn closed_announcer_marks_channel_down() {
        let mut mux = Multiplexer::new(
            RecordingSink::default(),
            RecordingAnnouncer {
                closed: true,
                ..Default::default()
            },
        );

        mux.register_subject(subject("A"));

        assert_eq!(mux.announcements(), 0);
        assert_eq!(mux.len(), 1);
        assert!(matches!(
            mux.sink().statuses.last(),
            Some(LinkStatus::ChannelDown { .. })
        ));
    }
}
