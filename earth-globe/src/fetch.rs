//reference:https://github.com/frewsxcv/rgis/blob/main/rgis-network/src/lib.rs
use std::io;

use earth_jobs::{Job, JobHandle};
use futures_util::StreamExt;

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },
    #[error("{0}")]
    Decode(#[from] quantized_mesh_decoder::DecodeError),
}

pub type FetchOutcome = Result<Vec<u8>, FetchError>;

/// Source of tile payload bytes. Each call starts one request.
pub trait TileFetcher: Send + Sync {
    fn fetch(&self, url: String) -> JobHandle<FetchOutcome>;
}

/// Fetches over HTTP(S) on the async compute task pool.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher;

impl TileFetcher for HttpFetcher {
    fn fetch(&self, url: String) -> JobHandle<FetchOutcome> {
        FetchTileJob { url }.spawn()
    }
}

pub struct FetchTileJob {
    pub url: String,
}

impl Job for FetchTileJob {
    type Outcome = FetchOutcome;

    fn name(&self) -> String {
        format!("fetch {}", self.url)
    }

    fn perform(self, ctx: earth_jobs::Context) -> earth_jobs::AsyncReturn<Self::Outcome> {
        Box::pin(async move {
            let fetch = async {
                let response = reqwest::get(&self.url).await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(FetchError::Status {
                        url: self.url.clone(),
                        status: status.as_u16(),
                    });
                }
                let total_size = response.content_length().unwrap_or(0);
                let mut bytes_stream = response.bytes_stream();
                let mut bytes = Vec::<u8>::with_capacity(total_size as usize);

                while let Some(bytes_chunk) = bytes_stream.next().await {
                    bytes.extend_from_slice(&bytes_chunk?);
                    if total_size > 0 {
                        let _ = ctx
                            .send_progress((bytes.len() as u64 * 100 / total_size).min(100) as u8)
                            .await;
                    }
                }
                Ok::<_, FetchError>(bytes)
            };
            #[cfg(not(target_arch = "wasm32"))]
            {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()?;
                runtime.block_on(fetch)
            }
            #[cfg(target_arch = "wasm32")]
            {
                fetch.await
            }
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::{collections::HashMap, sync::Mutex};

    use bevy::tasks::{AsyncComputeTaskPool, TaskPool};
    use earth_jobs::{AsyncReturn, Context, Job, JobHandle, JobStatus};

    use super::{FetchError, FetchOutcome, TileFetcher};

    struct CannedJob {
        url: String,
        bytes: Option<Vec<u8>>,
    }
    impl Job for CannedJob {
        type Outcome = FetchOutcome;
        fn name(&self) -> String {
            format!("canned {}", self.url)
        }
        fn perform(self, _context: Context) -> AsyncReturn<FetchOutcome> {
            Box::pin(async move {
                match self.bytes {
                    Some(bytes) => Ok(bytes),
                    None => Err(FetchError::Status {
                        url: self.url,
                        status: 404,
                    }),
                }
            })
        }
    }

    /// Answers from a fixed url table and records every request. Unknown
    /// urls get the fallback, or fail with 404 without one.
    #[derive(Default)]
    pub struct CannedFetcher {
        pub responses: HashMap<String, Vec<u8>>,
        pub fallback: Option<Vec<u8>>,
        pub requests: Mutex<Vec<String>>,
    }
    impl CannedFetcher {
        pub fn new() -> Self {
            AsyncComputeTaskPool::init(TaskPool::default);
            Self::default()
        }
        pub fn with_response(mut self, url: &str, bytes: Vec<u8>) -> Self {
            self.responses.insert(url.to_string(), bytes);
            self
        }
        pub fn with_fallback(mut self, bytes: Vec<u8>) -> Self {
            self.fallback = Some(bytes);
            self
        }
        pub fn request_count(&self) -> usize {
            self.requests.lock().map(|requests| requests.len()).unwrap_or(0)
        }
    }
    impl TileFetcher for CannedFetcher {
        fn fetch(&self, url: String) -> JobHandle<FetchOutcome> {
            if let Ok(mut requests) = self.requests.lock() {
                requests.push(url.clone());
            }
            let bytes = self.responses.get(&url).or(self.fallback.as_ref()).cloned();
            CannedJob { url, bytes }.spawn()
        }
    }

    /// Retries `done` for up to five seconds.
    pub fn wait_until(mut done: impl FnMut() -> bool) {
        let start = instant::Instant::now();
        while !done() && start.elapsed().as_secs() < 5 {
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
    }

    fn wait_for(handle: &mut JobHandle<FetchOutcome>) -> Result<Vec<u8>, String> {
        let mut result = Err("pending".to_string());
        wait_until(|| match handle.poll() {
            JobStatus::Pending => false,
            JobStatus::Ready(outcome) => {
                result = outcome.map_err(|e| e.to_string());
                true
            }
            JobStatus::Failed => {
                result = Err("failed".into());
                true
            }
        });
        result
    }

    #[test]
    fn canned_fetcher_answers_known_urls() {
        let fetcher = CannedFetcher::new().with_response("a", vec![1, 2]);
        let mut known = fetcher.fetch("a".into());
        let mut unknown = fetcher.fetch("b".into());
        assert_eq!(wait_for(&mut known), Ok(vec![1, 2]));
        assert_eq!(
            wait_for(&mut unknown),
            Err("b responded with status 404".to_string())
        );
        assert_eq!(fetcher.request_count(), 2);
    }
}
