//! Scene extraction from generated scripts.
//!
//! The model is asked for six lines starting with `Escena N:`. Nothing else
//! about the script is trusted: the scenes are whatever lines carry that
//! marker, in the order they appear.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{error, info, warn};

use crate::sheet::SceneSink;
use crate::topic::Topic;

pub const EXPECTED_SCENES: usize = 6;

static SCENE_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Escena \d+:.+").unwrap());

/// One line of a script, rendered as one clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scene {
    /// 1-based position in the script.
    pub index: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Malformed {
    NoScenes,
    SceneCount { expected: usize, found: usize },
}

impl fmt::Display for Malformed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Malformed::NoScenes => f.write_str("no \"Escena N:\" lines in script"),
            Malformed::SceneCount { expected, found } => {
                write!(f, "expected {expected} scenes, found {found}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptParse {
    Scenes(Vec<Scene>),
    Malformed(Malformed),
}

/// Every `Escena N: ...` line in order of appearance.
pub fn extract_scenes(script: &str) -> Vec<Scene> {
    SCENE_MARKER
        .find_iter(script)
        .enumerate()
        .map(|(i, m)| Scene {
            index: i + 1,
            text: m.as_str().trim().to_string(),
        })
        .collect()
}

/// Extracts scenes and checks them against the expected layout. In strict
/// mode anything but exactly [`EXPECTED_SCENES`] scenes is malformed.
pub fn parse_script(script: &str, strict: bool) -> ScriptParse {
    let scenes = extract_scenes(script);
    match scenes.len() {
        0 => ScriptParse::Malformed(Malformed::NoScenes),
        EXPECTED_SCENES => ScriptParse::Scenes(scenes),
        found if strict => ScriptParse::Malformed(Malformed::SceneCount {
            expected: EXPECTED_SCENES,
            found,
        }),
        found => {
            warn!(found, expected = EXPECTED_SCENES, "Unexpected scene count, using what was found");
            ScriptParse::Scenes(scenes)
        }
    }
}

/// Appends one `(topic, scene)` row per scene to the sink, in order.
///
/// Recording is best effort: the first failure is logged and the remaining
/// rows of this batch are skipped. Returns the number of rows written.
pub async fn record_scenes(
    sink: Option<&(dyn SceneSink + Send + Sync)>,
    topic: &Topic,
    scenes: &[Scene],
) -> usize {
    let Some(sink) = sink else {
        info!(topic = %topic, "No spreadsheet configured, skipping scene recording");
        return 0;
    };

    let mut written = 0;
    for scene in scenes {
        if let Err(e) = sink.append_row(topic.name(), &scene.text).await {
            error!(topic = %topic, scene = scene.index, error = %e, "Error saving scene");
            break;
        }
        written += 1;
    }
    info!(topic = %topic, rows = written, "Saved scenes to spreadsheet");
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PipelineError, PipelineResult};
    use std::sync::Mutex;

    const SCRIPT: &str = "Título: ¡Qué locura!\n\
        Escena 1: A\n\
        Algo de prosa entre escenas.\n\
        Escena 2: B\n\
        Escena 3: C\n\
        (pausa dramática)\n\
        Escena 4: D\n\
        Escena 5: E\n\
        Escena 6: F\n\
        #viral #humor #tendencia #mexico #shorts";

    #[derive(Default)]
    struct MemorySink {
        rows: Mutex<Vec<(String, String)>>,
        fail_after: Option<usize>,
    }

    #[async_trait::async_trait]
    impl SceneSink for MemorySink {
        async fn append_row(&self, topic: &str, scene: &str) -> PipelineResult<()> {
            let mut rows = self.rows.lock().unwrap();
            if self.fail_after == Some(rows.len()) {
                return Err(PipelineError::Sheet("quota".into()));
            }
            rows.push((topic.to_string(), scene.to_string()));
            Ok(())
        }
    }

    #[test]
    fn extracts_six_scenes_in_order() {
        let scenes = extract_scenes(SCRIPT);
        let texts: Vec<&str> = scenes.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(
            texts,
            ["Escena 1: A", "Escena 2: B", "Escena 3: C", "Escena 4: D", "Escena 5: E", "Escena 6: F"]
        );
        assert_eq!(scenes[5].index, 6);
    }

    #[test]
    fn keeps_order_of_appearance_not_marker_number() {
        let scenes = extract_scenes("Escena 2: segunda\nEscena 1: primera\n");
        assert_eq!(scenes[0].text, "Escena 2: segunda");
        assert_eq!(scenes[0].index, 1);
    }

    #[test]
    fn marker_does_not_span_lines() {
        let scenes = extract_scenes("Escena uno: nada\nEscena 3:\nsiguiente línea\n");
        assert!(scenes.is_empty());
    }

    #[test]
    fn no_markers_is_malformed() {
        assert_eq!(
            parse_script("Un guion sin formato.", false),
            ScriptParse::Malformed(Malformed::NoScenes)
        );
    }

    #[test]
    fn strict_mode_rejects_wrong_count() {
        let script = "Escena 1: A\nEscena 2: B\n";
        assert_eq!(
            parse_script(script, true),
            ScriptParse::Malformed(Malformed::SceneCount { expected: 6, found: 2 })
        );
        assert!(matches!(parse_script(script, false), ScriptParse::Scenes(s) if s.len() == 2));
    }

    #[tokio::test]
    async fn records_one_row_per_scene() {
        let sink = MemorySink::default();
        let scenes = extract_scenes(SCRIPT);
        let written = record_scenes(Some(&sink), &Topic::new("Tema A"), &scenes).await;
        assert_eq!(written, 6);
        let rows = sink.rows.lock().unwrap();
        assert_eq!(rows[0], ("Tema A".to_string(), "Escena 1: A".to_string()));
    }

    #[tokio::test]
    async fn sink_failure_stops_batch() {
        let sink = MemorySink {
            fail_after: Some(2),
            ..Default::default()
        };
        let scenes = extract_scenes(SCRIPT);
        assert_eq!(record_scenes(Some(&sink), &Topic::new("Tema A"), &scenes).await, 2);
    }

    #[tokio::test]
    async fn no_sink_records_nothing() {
        let scenes = extract_scenes(SCRIPT);
        assert_eq!(record_scenes(None, &Topic::new("Tema A"), &scenes).await, 0);
    }
}
