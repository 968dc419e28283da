//! Verification Side
//!
//! Everything a third party needs to check a finished game:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    PROOF SYSTEM                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  commitment.rs   - SHA-256 hash chain over the move log     │
//! │  codec.rs        - Board nibble packing, 2-bit move packing │
//! │  submission.rs   - Payload for the settlement layer         │
//! │  verify.rs       - Verification by replay                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod commitment;
pub mod codec;
pub mod submission;
pub mod verify;

// Re-export key types
pub use commitment::{MoveCommitment, commit_moves, GENESIS};
pub use codec::{pack_board, pack_board_values, unpack_board, pack_moves, unpack_moves, PackedMoves, CodecError};
pub use submission::{SubmissionPayload, SubmissionError};
pub use verify::{replay, verify, verify_submission, Replay, VerificationResult, VerificationError};
