//! Per-scene clip rendering and final concatenation through `ffmpeg`.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::error::{PipelineError, PipelineResult};
use crate::scenes::Scene;
use crate::tts::Narrator;

const OVERLAY_CHARS: usize = 40;

/// Where every artifact of one (topic, variation) lives.
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    root: PathBuf,
    slug: String,
}

impl ArtifactLayout {
    pub fn new(root: impl Into<PathBuf>, slug: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            slug: slug.into(),
        }
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn clip_dir(&self) -> PathBuf {
        self.root.join(format!("clips_{}", self.slug))
    }

    pub fn audio(&self, index: usize) -> PathBuf {
        self.clip_dir().join(format!("scene_{index}.mp3"))
    }

    pub fn video(&self, index: usize) -> PathBuf {
        self.clip_dir().join(format!("scene_{index}.mp4"))
    }

    pub fn manifest(&self) -> PathBuf {
        self.root.join(format!("videos_a_unir_{}.txt", self.slug))
    }

    pub fn final_video(&self) -> PathBuf {
        self.root.join(format!("video_final_{}.mp4", self.slug))
    }
}

/// Everything the encoder needs to produce one scene clip.
#[derive(Debug, Clone)]
pub struct ClipJob {
    pub audio: PathBuf,
    pub video: PathBuf,
    pub overlay: String,
}

#[async_trait::async_trait]
pub trait MediaEncoder {
    /// Solid background, burned-in overlay text and the narration track.
    async fn render_clip(&self, job: &ClipJob) -> PipelineResult<()>;

    /// Stream-copies the clips listed in `manifest` into `output`.
    async fn concat(&self, manifest: &Path, output: &Path) -> PipelineResult<()>;
}

#[derive(Debug, Clone)]
struct ClipStyle {
    background: String,
    width: u32,
    height: u32,
    seconds: u32,
    font_color: String,
    font_size: u32,
}

impl Default for ClipStyle {
    fn default() -> Self {
        Self {
            background: "white".to_string(),
            width: 720,
            height: 1280,
            seconds: 5,
            font_color: "black".to_string(),
            font_size: 24,
        }
    }
}

/// The `ffmpeg` binary.
pub struct Ffmpeg {
    program: String,
    style: ClipStyle,
}

impl Ffmpeg {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            style: ClipStyle::default(),
        }
    }

    pub fn render_args(&self, job: &ClipJob) -> Vec<String> {
        let s = &self.style;
        vec![
            "-y".into(),
            "-hide_banner".into(),
            "-f".into(),
            "lavfi".into(),
            "-i".into(),
            format!("color=c={}:s={}x{}:d={}", s.background, s.width, s.height, s.seconds),
            "-i".into(),
            job.audio.display().to_string(),
            "-vf".into(),
            format!(
                "drawtext=text='{}':fontcolor={}:fontsize={}:x=20:y=H-th-20",
                escape_option_value(&job.overlay),
                s.font_color,
                s.font_size
            ),
            "-shortest".into(),
            job.video.display().to_string(),
        ]
    }

    pub fn concat_args(manifest: &Path, output: &Path) -> Vec<String> {
        vec![
            "-hide_banner".into(),
            "-f".into(),
            "concat".into(),
            "-safe".into(),
            "0".into(),
            "-i".into(),
            manifest.display().to_string(),
            "-c".into(),
            "copy".into(),
            "-y".into(),
            output.display().to_string(),
        ]
    }

    async fn run(&self, args: &[String], output: &Path) -> PipelineResult<()> {
        debug!(program = %self.program, ?args, "Running encoder");
        let status = Command::new(&self.program)
            .args(args)
            .kill_on_drop(true)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|source| PipelineError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !status.success() {
            error!(output = %output.display(), code = ?status.code(), "ffmpeg failed");
            return Err(PipelineError::Encoder {
                code: status.code(),
                output: output.to_path_buf(),
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl MediaEncoder for Ffmpeg {
    async fn render_clip(&self, job: &ClipJob) -> PipelineResult<()> {
        self.run(&self.render_args(job), &job.video).await
    }

    async fn concat(&self, manifest: &Path, output: &Path) -> PipelineResult<()> {
        self.run(&Self::concat_args(manifest, output), output).await
    }
}

/// First characters of the scene with anything that would break the
/// `drawtext` expression removed.
pub fn overlay_text(scene: &str) -> String {
    let cleaned: String = scene
        .chars()
        .filter(|c| !matches!(c, '\'' | '"' | '\\' | '%'))
        .take(OVERLAY_CHARS)
        .collect();
    format!("{cleaned}...")
}

/// The filter graph strips the quotes around `text` but the option parser
/// still splits on `:`, so colons inside the overlay have to be escaped.
fn escape_option_value(text: &str) -> String {
    text.replace(':', r"\:")
}

/// Narration then clip for one scene.
async fn render_scene(
    narrator: &(dyn Narrator + Send + Sync),
    encoder: &(dyn MediaEncoder + Send + Sync),
    layout: &ArtifactLayout,
    scene: &Scene,
) -> PipelineResult<PathBuf> {
    let job = ClipJob {
        audio: layout.audio(scene.index),
        video: layout.video(scene.index),
        overlay: overlay_text(&scene.text),
    };
    narrator.narrate(&scene.text, &job.audio).await?;
    encoder.render_clip(&job).await?;
    info!(slug = layout.slug(), scene = scene.index, path = %job.video.display(), "Rendered clip");
    Ok(job.video)
}

/// Renders one clip per scene and returns their paths in scene order.
///
/// Up to `jobs` scenes are in flight at once; with `jobs <= 1` scenes are
/// rendered strictly one after another. Any failure aborts the remaining
/// scenes and no partial list is returned.
pub async fn render_clips(
    narrator: Arc<dyn Narrator + Send + Sync>,
    encoder: Arc<dyn MediaEncoder + Send + Sync>,
    layout: &ArtifactLayout,
    scenes: &[Scene],
    jobs: usize,
) -> PipelineResult<Vec<PathBuf>> {
    tokio::fs::create_dir_all(layout.clip_dir()).await?;

    if jobs <= 1 {
        let mut clips = Vec::with_capacity(scenes.len());
        for scene in scenes {
            clips.push(render_scene(narrator.as_ref(), encoder.as_ref(), layout, scene).await?);
        }
        return Ok(clips);
    }

    let permits = Arc::new(Semaphore::new(jobs));
    let mut set = JoinSet::new();
    for (pos, scene) in scenes.iter().cloned().enumerate() {
        let (narrator, encoder) = (Arc::clone(&narrator), Arc::clone(&encoder));
        let (layout, permits) = (layout.clone(), Arc::clone(&permits));
        set.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| PipelineError::Config(e.to_string()))?;
            let clip = render_scene(narrator.as_ref(), encoder.as_ref(), &layout, &scene).await?;
            Ok::<_, PipelineError>((pos, clip))
        });
    }

    let mut slots: Vec<Option<PathBuf>> = vec![None; scenes.len()];
    while let Some(joined) = set.join_next().await {
        let (pos, clip) = joined.map_err(|e| PipelineError::Io(std::io::Error::other(e)))??;
        slots[pos] = Some(clip);
    }
    Ok(slots.into_iter().flatten().collect())
}

/// Concat-demuxer manifest: one `file '<absolute path>'` line per clip.
pub fn concat_manifest(clips: &[PathBuf]) -> std::io::Result<String> {
    let mut manifest = String::new();
    for clip in clips {
        let absolute = std::path::absolute(clip)?;
        let quoted = absolute.display().to_string().replace('\'', r"'\''");
        manifest.push_str(&format!("file '{quoted}'\n"));
    }
    Ok(manifest)
}

/// Joins the clips into the final video for `layout`.
///
/// The manifest is removed once the encoder succeeds; on failure it is left
/// in place next to the output.
pub async fn combine_clips(
    encoder: &(dyn MediaEncoder + Send + Sync),
    layout: &ArtifactLayout,
    clips: &[PathBuf],
) -> PipelineResult<PathBuf> {
    if clips.is_empty() {
        return Err(PipelineError::NoClips(layout.slug().to_string()));
    }
    let manifest = layout.manifest();
    let output = layout.final_video();
    tokio::fs::write(&manifest, concat_manifest(clips)?).await?;
    info!(slug = layout.slug(), clips = clips.len(), "Combining clips");

    encoder.concat(&manifest, &output).await?;
    tokio::fs::remove_file(&manifest).await?;
    info!(path = %output.display(), "Final video written");
    Ok(output)
}
