use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

const HUB_URL: &str = "https://huggingface.co";

/// Files a T5 checkpoint needs on disk.
pub const CONFIG_FILE: &str = "config.json";
pub const TOKENIZER_FILE: &str = "tokenizer.json";
pub const WEIGHTS_FILE: &str = "model.safetensors";

pub struct ModelFiles {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: PathBuf,
}

/// Local cache of hub checkpoints. Files are fetched once and then served
/// from disk.
pub struct Hub {
    root: PathBuf,
    base_url: String,
    client: reqwest::blocking::Client,
}

pub fn default_cache_root() -> Result<PathBuf> {
    let mut path = dirs::cache_dir().context("Could not find cache directory")?;
    path.push("summarizer");
    path.push("models");
    Ok(path)
}

/// `owner/name` becomes `owner--name`, so every checkpoint gets one flat
/// directory under the cache root.
fn repo_dir_name(model_id: &str) -> Result<String> {
    let parts: Vec<&str> = model_id.split('/').collect();
    let valid = !parts.is_empty()
        && parts.len() <= 2
        && parts
            .iter()
            .all(|p| !p.is_empty() && *p != "." && *p != ".." && !p.contains('\\'));
    if !valid {
        bail!("invalid model id '{}'", model_id);
    }
    Ok(parts.join("--"))
}

impl Hub {
    pub fn new() -> Result<Self> {
        Ok(Self::with_root(default_cache_root()?))
    }

    pub fn with_root(root: PathBuf) -> Self {
        Self {
            root,
            base_url: HUB_URL.to_string(),
            client: reqwest::blocking::Client::new(),
        }
    }

    pub fn cached_path(&self, model_id: &str, file: &str) -> Result<PathBuf> {
        Ok(self.root.join(repo_dir_name(model_id)?).join(file))
    }

    /// Returns the local path of `file`, downloading it on a cache miss.
    pub fn get(&self, model_id: &str, file: &str) -> Result<PathBuf> {
        let path = self.cached_path(model_id, file)?;
        if path.exists() {
            debug!("Cache hit: {:?}", path);
            return Ok(path);
        }
        let url = format!("{}/{}/resolve/main/{}", self.base_url, model_id, file);
        self.download(&url, &path)?;
        Ok(path)
    }

    pub fn fetch_model(&self, model_id: &str) -> Result<ModelFiles> {
        Ok(ModelFiles {
            config: self.get(model_id, CONFIG_FILE)?,
            tokenizer: self.get(model_id, TOKENIZER_FILE)?,
            weights: self.get(model_id, WEIGHTS_FILE)?,
        })
    }

    fn download(&self, url: &str, dest: &Path) -> Result<()> {
        info!("Downloading {}", url);
        let dir = dest
            .parent()
            .ok_or_else(|| anyhow!("cache path {:?} has no parent", dest))?;
        fs::create_dir_all(dir).context("Failed to create model cache directory")?;

        let mut response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("Request to {} failed", url))?
            .error_for_status()
            .with_context(|| format!("Hub rejected {}", url))?;

        let bytes = store(&mut response, dest)
            .with_context(|| format!("Failed to download {}", url))?;
        info!("Cached {} bytes at {:?}", bytes, dest);
        Ok(())
    }
}

/// Streams `body` into `dest` through a sibling `.part` file, so an
/// interrupted fetch never looks like a cache hit. The partial file is
/// removed on failure.
fn store<R: io::Read>(body: &mut R, dest: &Path) -> Result<u64> {
    let partial = dest.with_extension("part");
    let written = copy_then_rename(body, &partial, dest);
    if written.is_err() {
        let _ = fs::remove_file(&partial);
    }
    written
}

fn copy_then_rename<R: io::Read>(body: &mut R, partial: &Path, dest: &Path) -> Result<u64> {
    let mut file =
        File::create(partial).with_context(|| format!("Failed to create {:?}", partial))?;
    let bytes = io::copy(body, &mut file)?;
    file.sync_all()?;
    fs::rename(partial, dest).context("Failed to move download into cache")?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_dir_name_flattens_owner() {
        assert_eq!(repo_dir_name("google-t5/t5-base").unwrap(), "google-t5--t5-base");
        assert_eq!(repo_dir_name("t5-small").unwrap(), "t5-small");
    }

    #[test]
    fn repo_dir_name_rejects_bad_ids() {
        for id in ["", "/", "a/", "../etc", "a/b/c", "a\\b"] {
            assert!(repo_dir_name(id).is_err(), "{id:?} should be rejected");
        }
    }

    #[test]
    fn cache_hit_skips_network() {
        let tmp = tempfile::tempdir().unwrap();
        let hub = Hub::with_root(tmp.path().to_path_buf());
        let path = hub.cached_path("owner/model", CONFIG_FILE).unwrap();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{}").unwrap();

        let got = hub.get("owner/model", CONFIG_FILE).unwrap();
        assert_eq!(got, path);
        assert_eq!(got, tmp.path().join("owner--model").join("config.json"));
    }

    #[test]
    fn fetch_model_resolves_all_cached_files() {
        let tmp = tempfile::tempdir().unwrap();
        let hub = Hub::with_root(tmp.path().to_path_buf());
        for file in [CONFIG_FILE, TOKENIZER_FILE, WEIGHTS_FILE] {
            let path = hub.cached_path("owner/model", file).unwrap();
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, b"x").unwrap();
        }
        let files = hub.fetch_model("owner/model").unwrap();
        assert!(files.weights.ends_with("owner--model/model.safetensors"));
        assert!(files.tokenizer.ends_with("owner--model/tokenizer.json"));
    }

    /// Serves a single HTTP response on a loopback port and returns its base URL.
    fn serve_once(status: &'static str, body: &'static [u8]) -> String {
        use std::io::{Read, Write};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let head = format!(
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status,
                body.len()
            );
            stream.write_all(head.as_bytes()).unwrap();
            stream.write_all(body).unwrap();
        });
        format!("http://{}", addr)
    }

    fn local_hub(root: &Path, base_url: String) -> Hub {
        Hub {
            root: root.to_path_buf(),
            base_url,
            client: reqwest::blocking::Client::builder().no_proxy().build().unwrap(),
        }
    }

    #[test]
    fn download_lands_in_cache_without_partial_file() {
        let tmp = tempfile::tempdir().unwrap();
        let base = serve_once("200 OK", b"{\"d_model\": 8}");
        let hub = local_hub(tmp.path(), base);

        let path = hub.get("owner/model", CONFIG_FILE).unwrap();
        assert_eq!(path, hub.cached_path("owner/model", CONFIG_FILE).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"d_model\": 8}");
        assert!(!path.with_extension("part").exists());
    }

    #[test]
    fn rejected_download_leaves_no_cache_entry() {
        let tmp = tempfile::tempdir().unwrap();
        let base = serve_once("404 Not Found", b"missing");
        let hub = local_hub(tmp.path(), base);

        assert!(hub.get("owner/model", WEIGHTS_FILE).is_err());
        let path = hub.cached_path("owner/model", WEIGHTS_FILE).unwrap();
        assert!(!path.exists());
        assert!(!path.with_extension("part").exists());
    }

    #[test]
    fn failed_write_removes_partial_file() {
        struct Broken;
        impl io::Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            }
        }

        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("model.safetensors");
        assert!(store(&mut Broken, &dest).is_err());
        assert!(!dest.exists());
        assert!(!dest.with_extension("part").exists());
    }
}
