mod muxer;

pub use muxer::{FfmpegMuxer, Muxer};

use crate::api::RelayClient;
use crate::clip::{is_remote, media_cache_dir, GeneratedClip};
use crate::error::Result;
use muxer::MuxInput;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Cache file for one remote locator. The name is keyed by the URL, so
/// regenerated media never resolves to an older download.
fn cached_path(cache_dir: &Path, kind: &str, locator: &str, extension: &str) -> PathBuf {
    let mut hasher = DefaultHasher::new();
    locator.hash(&mut hasher);
    cache_dir.join(format!("{}_{:016x}.{}", kind, hasher.finish(), extension))
}

async fn localize(client: &RelayClient, locator: &str, cache_dir: &Path, kind: &str, extension: &str) -> Result<PathBuf> {
    if !is_remote(locator) {
        return Ok(PathBuf::from(locator));
    }
    let path = cached_path(cache_dir, kind, locator, extension);
    if tokio::fs::metadata(&path).await.is_ok() {
        debug!("Using cached {}", path.display());
        return Ok(path);
    }
    tokio::fs::create_dir_all(cache_dir).await?;
    client.download(locator, &path).await?;
    Ok(path)
}

/// Local files for every complete clip, downloading remote media into the
/// clip's cache directory. Clips without a video are skipped.
pub async fn collect_inputs(client: &RelayClient, clips: &[&GeneratedClip], work_dir: &Path) -> Result<Vec<MuxInput>> {
    let mut inputs = Vec::with_capacity(clips.len());
    for clip in clips {
        let Some(video_url) = clip.video_url.as_deref().filter(|_| clip.is_complete()) else {
            warn!("Skipping {} (no video)", clip.id());
            continue;
        };

        let cache_dir = media_cache_dir(work_dir, clip.id());
        let video = localize(client, video_url, &cache_dir, "video", "mp4").await?;
        let voice = match clip.voice_url.as_deref() {
            Some(url) => Some(localize(client, url, &cache_dir, "voice", "wav").await?),
            None => None,
        };
        let music = match clip.audio_url.as_deref() {
            Some(url) => Some(localize(client, url, &cache_dir, "music", "wav").await?),
            None => None,
        };

        inputs.push(MuxInput { video, voice, music });
    }
    Ok(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::serve_once;
    use crate::clip::{ClipField, ClipPrompt};
    use crate::storyboard::{SessionStore, StoryboardState};

    #[tokio::test]
    async fn edited_clip_renders_its_new_video() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        let client = RelayClient::new("http://127.0.0.1:9/api", None).unwrap();
        let mut state = StoryboardState::new();
        state.replace_prompts(vec![ClipPrompt::new("dunes".into(), "Sand moves.".into(), None)]);
        let id = state.prompts()[0].id.clone();

        let (old_base, _old_server) = serve_once("200 OK", "video/mp4", b"OLD VIDEO".to_vec()).await;
        state.apply_video(&id, format!("{}/old.mp4", old_base));
        let inputs = collect_inputs(&client, &state.playable_clips(), dir.path()).await.unwrap();
        let old_path = inputs[0].video.clone();
        assert_eq!(tokio::fs::read(&old_path).await.unwrap(), b"OLD VIDEO");

        let removed = state.edit_field(&id, ClipField::VideoPrompt, "dunes at night".into()).unwrap();
        store.release_assets(&removed.unwrap()).await;
        assert!(!old_path.exists());

        let (new_base, _new_server) = serve_once("200 OK", "video/mp4", b"NEW VIDEO".to_vec()).await;
        state.apply_video(&id, format!("{}/new.mp4", new_base));
        let inputs = collect_inputs(&client, &state.playable_clips(), dir.path()).await.unwrap();
        assert_eq!(tokio::fs::read(&inputs[0].video).await.unwrap(), b"NEW VIDEO");
    }

    #[test]
    fn cache_names_follow_the_locator() {
        let dir = Path::new("/work/cache/clip-a");
        let first = cached_path(dir, "video", "https://cdn.example/1.mp4", "mp4");
        let again = cached_path(dir, "video", "https://cdn.example/1.mp4", "mp4");
        let other = cached_path(dir, "video", "https://cdn.example/2.mp4", "mp4");
        assert_eq!(first, again);
        assert_ne!(first, other);
        assert!(first.starts_with(dir));
    }

    #[tokio::test]
    async fn local_media_is_used_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let client = RelayClient::new("http://127.0.0.1:9/api", None).unwrap();
        let mut clip = GeneratedClip::from_prompt(ClipPrompt::new("a".into(), "b".into(), None));
        clip.video_url = Some("/media/a.mp4".into());
        clip.voice_url = Some("/media/a.wav".into());
        let partial = GeneratedClip::from_prompt(ClipPrompt::new("c".into(), "d".into(), None));

        let inputs = collect_inputs(&client, &[&clip, &partial], dir.path()).await.unwrap();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].video, PathBuf::from("/media/a.mp4"));
        assert_eq!(inputs[0].voice, Some(PathBuf::from("/media/a.wav")));
        assert_eq!(inputs[0].music, None);
    }
}
