/// Events emitted while a plan runs, for progress rendering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgressEvent {
    DownloadStarted {
        name: String,
        total_bytes: Option<u64>,
    },
    DownloadProgress {
        name: String,
        downloaded: u64,
        total_bytes: Option<u64>,
    },
    DownloadCompleted {
        name: String,
        total_bytes: u64,
    },
    UnpackStarted {
        name: String,
    },
    UnpackCompleted {
        name: String,
    },
}

pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send + Sync>;
