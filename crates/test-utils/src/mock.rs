//! Scriptable in-memory [`EarthEngine`].
//!
//! Answers are keyed by the scene id or collection an expression is rooted
//! at, so tests can describe "scene S2_A has 0 valid pixels" without caring
//! about the exact expression tree the service builds.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use ee_client::{
    CollectionQuery, EarthEngine, EeError, Geometry, ImageExpr, ProjectInfo, ProjectSource,
    Reducer, Result, SceneCoverage, VisParams,
};
use serde_json::{Map, Value};

/// A recorded `reduce_region` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ReduceCall {
    /// Scene id or collection the reduced image is rooted at.
    pub key: String,
    pub reducer: Reducer,
    pub scale: f64,
}

/// In-memory backend for tests.
pub struct MockEarthEngine {
    project: ProjectInfo,
    scenes: HashMap<String, Vec<SceneCoverage>>,
    dated_scenes: HashMap<(String, String), Vec<SceneCoverage>>,
    valid_pixels: HashMap<String, u64>,
    reductions: HashMap<(String, &'static str), Map<String, Value>>,
    failing: HashMap<String, String>,
    fail_initialize: Option<String>,
    panic_on: HashSet<(String, &'static str)>,
    calls: Mutex<usize>,
    reduce_calls: Mutex<Vec<ReduceCall>>,
}

impl Default for MockEarthEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEarthEngine {
    pub fn new() -> Self {
        Self {
            project: ProjectInfo::initialized("test-project", ProjectSource::Default),
            scenes: HashMap::new(),
            dated_scenes: HashMap::new(),
            valid_pixels: HashMap::new(),
            reductions: HashMap::new(),
            failing: HashMap::new(),
            fail_initialize: None,
            panic_on: HashSet::new(),
            calls: Mutex::new(0),
            reduce_calls: Mutex::new(Vec::new()),
        }
    }

    /// Scenes (id, cloud coverage %) returned for `collection`, in order.
    pub fn with_scenes(mut self, collection: &str, scenes: &[(&str, f64)]) -> Self {
        self.scenes
            .insert(collection.to_string(), to_coverage(scenes));
        self
    }

    /// Scenes returned for `collection` only when queried with
    /// `start_date`; takes precedence over [`Self::with_scenes`].
    pub fn with_scenes_for(
        mut self,
        collection: &str,
        start_date: &str,
        scenes: &[(&str, f64)],
    ) -> Self {
        self.dated_scenes.insert(
            (collection.to_string(), start_date.to_string()),
            to_coverage(scenes),
        );
        self
    }

    /// Valid-pixel count reported for any image rooted at `scene`.
    /// Scenes without an entry report zero.
    pub fn with_valid_pixels(mut self, scene: &str, count: u64) -> Self {
        self.valid_pixels.insert(scene.to_string(), count);
        self
    }

    /// Canned reduction result for images rooted at `key` (scene id or
    /// collection) under `reducer`.
    pub fn with_reduction(mut self, key: &str, reducer: &Reducer, result: Value) -> Self {
        let map = match result {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self.reductions
            .insert((key.to_string(), reducer_tag(reducer)), map);
        self
    }

    /// Every operation touching `key` fails with `message`.
    pub fn failing(mut self, key: &str, message: &str) -> Self {
        self.failing.insert(key.to_string(), message.to_string());
        self
    }

    /// `reduce_region` with `reducer` on images rooted at `key` panics.
    pub fn panicking(mut self, key: &str, reducer: &Reducer) -> Self {
        self.panic_on.insert((key.to_string(), reducer_tag(reducer)));
        self
    }

    /// `initialize` fails with `message`.
    pub fn failing_initialize(mut self, message: &str) -> Self {
        self.fail_initialize = Some(message.to_string());
        self
    }

    /// Total number of backend operations performed.
    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    /// Every `reduce_region` call so far, in call order.
    pub fn reduce_calls(&self) -> Vec<ReduceCall> {
        self.reduce_calls.lock().unwrap().clone()
    }

    fn touch(&self, key: &str) -> Result<()> {
        *self.calls.lock().unwrap() += 1;
        match self.failing.get(key) {
            Some(message) => Err(EeError::Backend {
                status: 500,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

fn to_coverage(scenes: &[(&str, f64)]) -> Vec<SceneCoverage> {
    scenes
        .iter()
        .map(|(id, cover)| SceneCoverage {
            id: id.to_string(),
            cloud_coverage: Some(*cover),
        })
        .collect()
}

fn reducer_tag(reducer: &Reducer) -> &'static str {
    match reducer {
        Reducer::Count => "count",
        Reducer::First => "first",
        Reducer::Mean => "mean",
        Reducer::MeanMinMax => "mean_min_max",
        Reducer::Percentile { .. } => "percentile",
    }
}

/// Scene id or collection an expression is rooted at.
pub fn expr_root(expr: &ImageExpr) -> String {
    match expr {
        ImageExpr::Scene { id, .. } => id.clone(),
        ImageExpr::Composite { query, .. } => query.collection.clone(),
        ImageExpr::UpdateMask { input, .. }
        | ImageExpr::Select { input, .. }
        | ImageExpr::Rename { input, .. }
        | ImageExpr::NormalizedDifference { input, .. }
        | ImageExpr::Clip { input, .. } => expr_root(input),
        ImageExpr::Cat { inputs } => inputs.first().map(expr_root).unwrap_or_default(),
    }
}

fn first_band(expr: &ImageExpr) -> String {
    match expr {
        ImageExpr::Select { bands, .. } => bands.first().cloned().unwrap_or_default(),
        ImageExpr::Rename { names, .. } => names.first().cloned().unwrap_or_default(),
        ImageExpr::NormalizedDifference { name, .. } => name.clone(),
        ImageExpr::UpdateMask { input, .. } | ImageExpr::Clip { input, .. } => first_band(input),
        ImageExpr::Cat { inputs } => inputs.first().map(first_band).unwrap_or_default(),
        ImageExpr::Scene { .. } | ImageExpr::Composite { .. } => "band".to_string(),
    }
}

#[async_trait]
impl EarthEngine for MockEarthEngine {
    async fn initialize(&self) -> Result<()> {
        *self.calls.lock().unwrap() += 1;
        match self.fail_initialize {
            Some(ref message) => Err(EeError::initialization(message.clone())),
            None => Ok(()),
        }
    }

    async fn scene_cloud_coverage(&self, query: &CollectionQuery) -> Result<Vec<SceneCoverage>> {
        self.touch(&query.collection)?;
        let dated = (query.collection.clone(), query.start_date.clone());
        Ok(self
            .dated_scenes
            .get(&dated)
            .or_else(|| self.scenes.get(&query.collection))
            .cloned()
            .unwrap_or_default())
    }

    async fn reduce_region(
        &self,
        image: &ImageExpr,
        reducer: &Reducer,
        _geometry: &Geometry,
        scale: f64,
    ) -> Result<Map<String, Value>> {
        let key = expr_root(image);
        self.touch(&key)?;
        if self.panic_on.contains(&(key.clone(), reducer_tag(reducer))) {
            panic!("mock backend panic for {}", key);
        }
        self.reduce_calls.lock().unwrap().push(ReduceCall {
            key: key.clone(),
            reducer: reducer.clone(),
            scale,
        });

        if let Reducer::Count = reducer {
            let count = self.valid_pixels.get(&key).copied().unwrap_or(0);
            let mut map = Map::new();
            map.insert(first_band(image), Value::from(count));
            return Ok(map);
        }

        Ok(self
            .reductions
            .get(&(key, reducer_tag(reducer)))
            .cloned()
            .unwrap_or_default())
    }

    async fn tile_url(&self, image: &ImageExpr, _vis: &VisParams) -> Result<String> {
        let key = expr_root(image);
        self.touch(&key)?;
        Ok(format!(
            "https://tiles.test/v1/projects/{}/maps/{}/tiles/{{z}}/{{x}}/{{y}}",
            self.project.project_id, key
        ))
    }

    fn project_info(&self) -> ProjectInfo {
        self.project.clone()
    }
}
