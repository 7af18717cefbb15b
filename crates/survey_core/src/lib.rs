use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;
use shared::{
    domain::{Feature, Interactivity, Program, Question},
    protocol::{ColorDocument, ProgramDocument},
};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{error, info};
use url::form_urlencoded;

pub mod http;
pub mod loading;
pub mod message;

pub use http::{FetchError, HttpClient};
pub use loading::{ConcurrentLoadError, LoadingGate, LoadingToken};
pub use message::{
    interactivity_message, FeatureDescriptor, CARTOGRAM_FEATURES, POPULATION_FEATURES,
};

/// Map scaling applied once when the wizard takes over the renderer.
const SCALING_FACTOR: f64 = 1.7;
const DEFAULT_ANIMATION_DURATION_MS: u64 = 1000;
const LAND_AREA_TITLE: &str = "Land Area";
const POPULATION_TITLE: &str = "Population";

/// The five base URLs the wizard navigates between, supplied once at
/// construction. Configured without trailing slashes.
#[derive(Debug, Clone)]
pub struct SurveyUrls {
    pub animation_base: String,
    pub paired_maps_base: String,
    pub data_base: String,
    pub surveys_base: String,
    pub surveys_ui_base: String,
}

/// Per-question interactivity switches handed to the renderer before any
/// branch runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteractivitySettings {
    pub tooltip: bool,
    pub highlight: bool,
    pub animation_duration_ms: u64,
}

impl InteractivitySettings {
    pub fn for_question(question: &Question) -> Self {
        let deactivate = question.deactivations();
        Self {
            tooltip: !deactivate.contains(&Feature::Tooltip),
            highlight: !deactivate.contains(&Feature::Highlight),
            animation_duration_ms: if deactivate.contains(&Feature::Animation) {
                0
            } else {
                DEFAULT_ANIMATION_DURATION_MS
            },
        }
    }
}

impl Default for InteractivitySettings {
    fn default() -> Self {
        Self {
            tooltip: true,
            highlight: true,
            animation_duration_ms: DEFAULT_ANIMATION_DURATION_MS,
        }
    }
}

/// Which pregenerated rendition of a map the renderer should hand back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapVersion {
    Original,
    Population,
}

impl MapVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            MapVersion::Original => "original",
            MapVersion::Population => "population",
        }
    }
}

/// Everything the renderer needs for the side-by-side land-area/population
/// draw of the cartogram branch.
#[derive(Debug, Clone)]
pub struct PairedMapRequest {
    pub land_area_map: Value,
    pub population_map: Value,
    pub geometry: Value,
    pub labels: Value,
    pub map_config: Value,
    pub color_data: Value,
    pub land_area_title: String,
    pub data_title: String,
    pub population_title: String,
}

/// Tooltip handles produced by a successful paired draw.
#[derive(Debug, Clone)]
pub struct PairedMapHandles {
    pub land_area_tooltip: Value,
    pub population_tooltip: Value,
}

/// The external map-rendering engine.
#[async_trait]
pub trait MapRenderer: Send + Sync {
    fn set_scaling_factor(&self, factor: f64);
    fn apply_interactivity(&self, settings: InteractivitySettings);
    async fn switch_map(&self, map: &str, colors: Option<ColorDocument>) -> Result<()>;
    async fn labels(&self, map: &str) -> Result<Value>;
    async fn map_config(&self, map: &str) -> Result<Value>;
    fn pregenerated_map(&self, map: &str, version: MapVersion) -> Result<Value>;
    async fn draw_paired_maps(&self, request: PairedMapRequest) -> Result<PairedMapHandles>;
    /// Replaces the whole tooltip registry with the given entries, in order.
    fn replace_tooltips(&self, tooltips: Vec<Value>);
    fn reveal_cartogram(&self);
}

/// The page shell: navigation controls, the question indicator, the message
/// area and the fatal-error display.
pub trait SurveyPage: Send + Sync {
    fn set_interactivity_message(&self, text: &str);
    fn set_question_number(&self, number: usize);
    /// `None` hides the control; `Some` binds it to the given target.
    fn set_next_link(&self, target: Option<&str>);
    fn set_prev_link(&self, target: Option<&str>);
    fn fatal_error(&self, message: &str);
}

/// Terminal outcome of one dispatch call. A redirect and an in-page render
/// are mutually exclusive; the caller performs the actual navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Leave the page for the given URL.
    Redirect(String),
    /// The in-page branch completed.
    Rendered,
    /// Guard precondition failed; nothing happened.
    Skipped,
    /// The failure was handed to the page's fatal-error display.
    Faulted,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Busy(#[from] ConcurrentLoadError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("rendering engine failure: {0}")]
    Renderer(anyhow::Error),
    #[error("failed to encode the maps payload: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("a background fetch was aborted: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Drives the survey wizard: loads programs, dispatches questions to a
/// redirect or an in-page render, and keeps the navigation controls current.
pub struct SurveyClient {
    http: HttpClient,
    urls: SurveyUrls,
    renderer: Arc<dyn MapRenderer>,
    page: Arc<dyn SurveyPage>,
    gate: LoadingGate,
    program: RwLock<Option<Program>>,
}

impl SurveyClient {
    pub fn new(
        urls: SurveyUrls,
        renderer: Arc<dyn MapRenderer>,
        page: Arc<dyn SurveyPage>,
    ) -> Arc<Self> {
        renderer.set_scaling_factor(SCALING_FACTOR);
        Arc::new(Self {
            http: HttpClient::new(),
            urls,
            renderer,
            page,
            gate: LoadingGate::new(),
            program: RwLock::new(None),
        })
    }

    /// Currently loaded program, if any.
    pub async fn program(&self) -> Option<Program> {
        self.program.read().await.clone()
    }

    /// Fetches `{surveys_base}/{name}/program.json` and installs it as the
    /// active program. Rejected immediately when another load (or a
    /// cartogram dispatch) is in flight; the gate is released on every exit
    /// path.
    pub async fn load_survey(&self, name: &str) -> Result<(), LoadError> {
        let _token = self.gate.acquire()?;

        let url = format!("{}/{}/program.json", self.urls.surveys_base, name);
        let document: ProgramDocument = self.http.get(&url).await?;

        info!(
            survey = name,
            questions = document.questions.len(),
            "survey program loaded"
        );
        *self.program.write().await = Some(Program {
            name: name.to_string(),
            questions: document.questions,
        });
        Ok(())
    }

    /// Dispatches one question: configures the renderer's interactivity,
    /// then either returns a redirect for the caller to perform or renders
    /// in place. Navigation controls update as soon as the branch is
    /// initiated; they never wait on the network.
    pub async fn display_question(&self, id: usize) -> Result<DispatchOutcome, DispatchError> {
        if self.gate.is_busy() {
            return Ok(DispatchOutcome::Skipped);
        }

        let (question, survey_name, total) = {
            let guard = self.program.read().await;
            let Some(program) = guard.as_ref() else {
                return Ok(DispatchOutcome::Skipped);
            };
            let Some(question) = program.questions.get(id) else {
                error!(id, survey = %program.name, "question index out of range");
                self.page
                    .fatal_error(&format!("No question {id} in the current survey."));
                return Ok(DispatchOutcome::Faulted);
            };
            (
                question.clone(),
                program.name.clone(),
                program.questions.len(),
            )
        };

        self.renderer
            .apply_interactivity(InteractivitySettings::for_question(&question));

        match question {
            Question::Animation {
                ref name,
                ref interactive,
            } => {
                let url = self.animation_redirect(name, id, total, &survey_name, interactive);
                self.update_controls(id, total, &survey_name);
                info!(id, %url, "redirecting to the animation page");
                Ok(DispatchOutcome::Redirect(url))
            }
            Question::ThreeMaps {
                ref map,
                ref maps,
                ref interactive,
            } => {
                let url =
                    self.paired_maps_redirect(map, maps, id, total, &survey_name, interactive)?;
                self.update_controls(id, total, &survey_name);
                info!(id, %url, "redirecting to the paired-maps page");
                Ok(DispatchOutcome::Redirect(url))
            }
            Question::Population {
                map,
                colors,
                interactive,
            } => {
                self.display_population(id, total, &survey_name, &map, colors, interactive)
                    .await
            }
            Question::Cartogram {
                data,
                map,
                interactive,
            } => {
                self.display_cartogram(id, total, &survey_name, &data, &map, interactive)
                    .await
            }
            Question::Unrecognized => {
                error!(id, "unrecognized question type");
                self.page.fatal_error("Unrecognized question type.");
                self.update_controls(id, total, &survey_name);
                Ok(DispatchOutcome::Faulted)
            }
        }
    }

    /// Hides or rebinds the prev/next controls and refreshes the question
    /// indicator.
    pub fn update_controls(&self, id: usize, total: usize, survey_name: &str) {
        if id + 1 == total {
            self.page.set_next_link(None);
        } else {
            self.page
                .set_next_link(Some(&self.ui_target(survey_name, id + 1)));
        }

        if id == 0 {
            self.page.set_prev_link(None);
        } else {
            self.page
                .set_prev_link(Some(&self.ui_target(survey_name, id - 1)));
        }

        self.page.set_question_number(id + 1);
    }

    async fn display_population(
        &self,
        id: usize,
        total: usize,
        survey_name: &str,
        map: &str,
        colors: Option<String>,
        interactive: Option<Interactivity>,
    ) -> Result<DispatchOutcome, DispatchError> {
        let pending_colors = colors.map(|colors| {
            let url = format!("{}/{}.json", self.urls.data_base, colors);
            let http = self.http.clone();
            tokio::spawn(async move { http.get::<ColorDocument>(&url).await })
        });

        self.update_controls(id, total, survey_name);

        let color_document = match pending_colors {
            Some(handle) => Some(handle.await??),
            None => None,
        };
        self.renderer
            .switch_map(map, color_document)
            .await
            .map_err(DispatchError::Renderer)?;

        let deactivations = interactive
            .as_ref()
            .map(|i| i.deactivate.as_slice())
            .unwrap_or(&[]);
        self.page
            .set_interactivity_message(&interactivity_message(&POPULATION_FEATURES, deactivations));
        Ok(DispatchOutcome::Rendered)
    }

    async fn display_cartogram(
        &self,
        id: usize,
        total: usize,
        survey_name: &str,
        data: &str,
        map: &str,
        interactive: Option<Interactivity>,
    ) -> Result<DispatchOutcome, DispatchError> {
        let Ok(_token) = self.gate.acquire() else {
            return Ok(DispatchOutcome::Skipped);
        };

        // All four fetches race as spawned tasks; a loser keeps running
        // detached and its result is discarded.
        let ui_task = {
            let url = format!("{}/{}_cartogramui.json", self.urls.data_base, data);
            let http = self.http.clone();
            tokio::spawn(async move { http.get::<ColorDocument>(&url).await })
        };
        let geometry_task = {
            let url = format!("{}/{}_cartogram.json", self.urls.data_base, data);
            let http = self.http.clone();
            tokio::spawn(async move { http.get::<Value>(&url).await })
        };
        let labels_task = {
            let renderer = Arc::clone(&self.renderer);
            let map = map.to_string();
            tokio::spawn(async move { renderer.labels(&map).await })
        };
        let config_task = {
            let renderer = Arc::clone(&self.renderer);
            let map = map.to_string();
            tokio::spawn(async move { renderer.map_config(&map).await })
        };

        self.update_controls(id, total, survey_name);

        let fetched = tokio::try_join!(
            async { Ok::<_, DispatchError>(ui_task.await??) },
            async { Ok::<_, DispatchError>(geometry_task.await??) },
            async { labels_task.await?.map_err(DispatchError::Renderer) },
            async { config_task.await?.map_err(DispatchError::Renderer) },
        );

        let result = match fetched {
            Ok((ui, geometry, labels, map_config)) => {
                self.complete_paired_draw(ui, geometry, labels, map_config, map, interactive.as_ref())
                    .await
            }
            Err(err) => Err(err),
        };

        match result {
            Ok(()) => Ok(DispatchOutcome::Rendered),
            Err(err) => {
                error!(id, "cartogram display failed: {err}");
                self.page.fatal_error(&err.to_string());
                Ok(DispatchOutcome::Faulted)
            }
        }
    }

    async fn complete_paired_draw(
        &self,
        ui: ColorDocument,
        geometry: Value,
        labels: Value,
        map_config: Value,
        map: &str,
        interactive: Option<&Interactivity>,
    ) -> Result<(), DispatchError> {
        let ColorDocument { color_data, tooltip } = ui;

        let land_area_map = self
            .renderer
            .pregenerated_map(map, MapVersion::Original)
            .map_err(DispatchError::Renderer)?;
        let population_map = self
            .renderer
            .pregenerated_map(map, MapVersion::Population)
            .map_err(DispatchError::Renderer)?;

        let handles = self
            .renderer
            .draw_paired_maps(PairedMapRequest {
                land_area_map,
                population_map,
                geometry,
                labels,
                map_config,
                color_data,
                land_area_title: LAND_AREA_TITLE.to_string(),
                data_title: tooltip.label.clone(),
                population_title: POPULATION_TITLE.to_string(),
            })
            .await
            .map_err(DispatchError::Renderer)?;

        self.renderer.replace_tooltips(vec![
            handles.land_area_tooltip,
            handles.population_tooltip,
            serde_json::to_value(&tooltip)?,
        ]);
        self.renderer.reveal_cartogram();

        let deactivations = interactive
            .map(|i| i.deactivate.as_slice())
            .unwrap_or(&[]);
        self.page
            .set_interactivity_message(&interactivity_message(&CARTOGRAM_FEATURES, deactivations));
        Ok(())
    }

    fn ui_target(&self, survey_name: &str, index: usize) -> String {
        format!("{}/{}/{}", self.urls.surveys_ui_base, survey_name, index)
    }

    fn animation_redirect(
        &self,
        name: &str,
        id: usize,
        total: usize,
        survey_name: &str,
        interactive: &Option<Interactivity>,
    ) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query.append_pair("hrq", &(id + 1).to_string());
        self.append_navigation_params(&mut query, id, total, survey_name, interactive);
        format!(
            "{}/{}?{}",
            self.urls.animation_base,
            name,
            query.finish()
        )
    }

    fn paired_maps_redirect(
        &self,
        map: &str,
        maps: &Value,
        id: usize,
        total: usize,
        survey_name: &str,
        interactive: &Option<Interactivity>,
    ) -> Result<String, DispatchError> {
        let payload = STANDARD.encode(serde_json::to_string(maps)?);
        let mut query = form_urlencoded::Serializer::new(String::new());
        query.append_pair("hrq", &(id + 1).to_string());
        query.append_pair("handler", map);
        query.append_pair("maps", &payload);
        self.append_navigation_params(&mut query, id, total, survey_name, interactive);
        Ok(format!("{}?{}", self.urls.paired_maps_base, query.finish()))
    }

    fn append_navigation_params(
        &self,
        query: &mut form_urlencoded::Serializer<'_, String>,
        id: usize,
        total: usize,
        survey_name: &str,
        interactive: &Option<Interactivity>,
    ) {
        if id + 1 < total {
            query.append_pair("next", &self.ui_target(survey_name, id + 1));
        }
        if id > 0 {
            query.append_pair("prev", &self.ui_target(survey_name, id - 1));
        }
        if let Some(interactive) = interactive {
            let joined = interactive
                .deactivate
                .iter()
                .map(Feature::as_str)
                .collect::<Vec<_>>()
                .join(",");
            query.append_pair("deactivate", &joined);
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
