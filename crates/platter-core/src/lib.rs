pub mod bend;
pub mod channel;
pub mod config;
pub mod diagnostics;
pub mod event;
pub mod fixtures;
pub mod loader;
pub mod offline;
pub mod report;
pub mod resample;
pub mod session;
pub mod source;
pub mod spline;

pub use bend::{
    BendEvent, BendMapping, Continuity, ControlPoint, ControlPoints, PitchBendExtractor,
};
pub use channel::{EventConsumer, EventProducer, event_channel};
pub use config::{DiagnosticsConfig, EngineConfig, PlatterConfig, RenderConfig};
pub use diagnostics::{TelemetryGuard, init_tracing_from_config, init_tracing_with_options};
pub use event::{MidiEvent, MidiEventKind, TimedMessage, normalize_bend};
pub use loader::{LoadOutcome, decode_audio_file, load_and_publish, spawn_load};
pub use offline::{
    BendScript, OfflineOptions, OfflineRender, ScriptEvent, ScriptMessage, render_offline,
    write_wav,
};
pub use report::{RenderReport, generate_report};
pub use resample::Playhead;
pub use session::{BlockReport, RenderMode, RenderSession, SessionConfig, SourceTransition};
pub use source::{AudioSource, Orientation, SourceError, SourceHandle};
pub use spline::{CubicSpline, SplineError};
