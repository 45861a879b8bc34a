//! Splitting multi-row writes under the parameter ceiling.

/// Rows per statement so that `rows * columns <= max_params`. At least one.
pub fn chunk_size(max_params: usize, columns: usize) -> usize {
    (max_params / columns.max(1)).max(1)
}

/// Split `rows` into statement-sized chunks. Empty input yields no chunks.
pub fn chunks<T>(rows: &[T], max_params: usize, columns: usize) -> std::slice::Chunks<'_, T> {
    rows.chunks(chunk_size(max_params, columns))
}
