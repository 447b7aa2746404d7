//! Mouse jiggler pattern
//!
//! Moves the pointer `width` pixels right then the same distance back, so the
//! loop keeps the host awake without drifting the cursor.

use crate::report::{CapacityError, MouseReport, Report, ScriptBuilder};

/// Fill `out` with the jiggler loop. Returns the record count (`2 * width + 1`).
pub fn generate<const N: usize>(width: usize, out: &mut ScriptBuilder<N>) -> Result<usize, CapacityError> {
    out.clear();
    for _ in 0..width {
        out.push(Report::Mouse(MouseReport::movement(1, 0)))?;
    }
    for _ in 0..width {
        out.push(Report::Mouse(MouseReport::movement(-1, 0)))?;
    }
    out.push(Report::End)?;
    Ok(out.len())
}
