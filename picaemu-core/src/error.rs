use thiserror::Error;

/// Validation errors raised when configuring the pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("shader program of {len} words exceeds program memory")]
    ProgramTooLong { len: usize },

    #[error("swizzle table of {len} words exceeds swizzle memory")]
    SwizzleDataTooLong { len: usize },

    #[error("entry point 0x{entry_point:03x} outside program memory")]
    EntryPointOutOfRange { entry_point: u32 },
}
