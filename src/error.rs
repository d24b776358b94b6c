use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("insufficient samples: got {got}, need at least {required}")]
    InsufficientSamples { got: usize, required: usize },

    #[error("mismatched samples: {times} time samples, {values} values")]
    MismatchedSamples { times: usize, values: usize },

    #[error("degenerate variance: observations are constant but residual is {ss_res}")]
    DegenerateVariance { ss_res: f64 },

    #[error("least squares system is singular")]
    SingularFit,

    #[error("cannot re-aim deceleration of a body at rest")]
    ZeroVelocityRecompute,

    #[error("object {object} is missing from frame {frame}")]
    MissingFrame { frame: usize, object: usize },

    #[error("Detector Error: {0}")]
    Detector(String),

    #[error("Backend Error: {0}")]
    Backend(String),

    #[error("unknown body handle")]
    UnknownBody,

    #[error("track {track}: {source}")]
    Track {
        track: usize,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub(crate) fn in_track(self, track: usize) -> Self {
        Error::Track {
            track,
            source: Box::new(self),
        }
    }
}
