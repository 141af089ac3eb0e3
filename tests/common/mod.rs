//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::any::Any;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::Mutex;

use glaive::document::Document;
use glaive::error::Result;
use glaive::index::{IndexReader, MemoryIndex};
use glaive::query::query::query_eq_as;
use glaive::query::{Evaluator, Query, QueryVisitor, ScoringMode, Weight};
use glaive::search::{Searcher, SearcherConfig};

/// Route log output through the test harness.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Five documents `"this is document i"` in the field `field`.
pub fn five_documents() -> MemoryIndex {
    let mut builder = MemoryIndex::builder();
    for i in 0..5 {
        builder.add_document(
            Document::builder()
                .add_text("field", format!("this is document {i}"))
                .build(),
        );
    }
    builder.build()
}

pub fn searcher(index: &MemoryIndex) -> Searcher {
    Searcher::new(index.segment_readers(), SearcherConfig::default())
        .expect("default config is valid")
}

/// What a [`RecordingQuery`] observed.
#[derive(Debug, Default)]
pub struct Recording {
    pub modes: Vec<ScoringMode>,
    pub score_calls: usize,
}

/// Wraps a query and records the modes its weights are created with and
/// how often its evaluators are asked for a score.
#[derive(Debug, Clone)]
pub struct RecordingQuery {
    inner: Box<dyn Query>,
    recording: Arc<Mutex<Recording>>,
}

impl RecordingQuery {
    pub fn new(inner: Box<dyn Query>) -> Self {
        RecordingQuery {
            inner,
            recording: Arc::new(Mutex::new(Recording::default())),
        }
    }

    pub fn boxed(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }

    pub fn modes(&self) -> Vec<ScoringMode> {
        self.recording.lock().modes.clone()
    }

    pub fn last_mode(&self) -> Option<ScoringMode> {
        self.recording.lock().modes.last().copied()
    }

    pub fn score_calls(&self) -> usize {
        self.recording.lock().score_calls
    }

    pub fn clear(&self) {
        let mut recording = self.recording.lock();
        recording.modes.clear();
        recording.score_calls = 0;
    }
}

impl PartialEq for RecordingQuery {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.recording, &other.recording) && *self.inner == *other.inner
    }
}

impl Eq for RecordingQuery {}

impl Hash for RecordingQuery {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.recording) as usize).hash(state);
        self.inner.hash(state);
    }
}

impl Query for RecordingQuery {
    fn weight(
        &self,
        searcher: &Searcher,
        scoring_mode: ScoringMode,
        boost: f32,
    ) -> Result<Box<dyn Weight>> {
        self.recording.lock().modes.push(scoring_mode);
        Ok(Box::new(RecordingWeight {
            inner: self.inner.weight(searcher, scoring_mode, boost)?,
            recording: Arc::clone(&self.recording),
        }))
    }

    fn rewrite(&self, searcher: &Searcher) -> Result<Option<Box<dyn Query>>> {
        Ok(self.inner.rewrite(searcher)?.map(|inner| {
            Box::new(RecordingQuery {
                inner,
                recording: Arc::clone(&self.recording),
            }) as Box<dyn Query>
        }))
    }

    fn visit(&self, visitor: &mut dyn QueryVisitor) {
        self.inner.visit(visitor);
    }

    fn boost(&self) -> f32 {
        self.inner.boost()
    }

    fn description(&self) -> String {
        format!("Recording({})", self.inner.description())
    }

    fn clone_box(&self) -> Box<dyn Query> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn query_eq(&self, other: &dyn Query) -> bool {
        query_eq_as(self, other)
    }

    fn query_hash(&self, mut state: &mut dyn Hasher) {
        self.hash(&mut state);
    }
}

#[derive(Debug)]
struct RecordingWeight {
    inner: Box<dyn Weight>,
    recording: Arc<Mutex<Recording>>,
}

impl Weight for RecordingWeight {
    fn scoring_mode(&self) -> ScoringMode {
        self.inner.scoring_mode()
    }

    fn evaluator(&self, reader: &Arc<dyn IndexReader>) -> Result<Option<Box<dyn Evaluator>>> {
        Ok(self.inner.evaluator(reader)?.map(|inner| {
            Box::new(RecordingEvaluator {
                inner,
                recording: Arc::clone(&self.recording),
            }) as Box<dyn Evaluator>
        }))
    }
}

#[derive(Debug)]
struct RecordingEvaluator {
    inner: Box<dyn Evaluator>,
    recording: Arc<Mutex<Recording>>,
}

impl Evaluator for RecordingEvaluator {
    fn doc_id(&self) -> u64 {
        self.inner.doc_id()
    }

    fn next(&mut self) -> Result<bool> {
        self.inner.next()
    }

    fn skip_to(&mut self, target: u64) -> Result<bool> {
        self.inner.skip_to(target)
    }

    fn cost(&self) -> u64 {
        self.inner.cost()
    }

    fn score(&mut self) -> Result<f32> {
        self.recording.lock().score_calls += 1;
        self.inner.score()
    }

    fn max_score(&self) -> f32 {
        self.inner.max_score()
    }

    fn set_min_competitive_score(&mut self, min_score: f32) {
        self.inner.set_min_competitive_score(min_score);
    }
}
