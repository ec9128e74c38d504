/// Output panel body height, shared with the layout budget.
pub const OUTPUT_WINDOW: i64 = 6;
pub const QUEUE_WINDOW: i64 = 3;

/// The most recent `max_count` items, oldest first. A non-positive count keeps
/// nothing; a count past the end keeps everything.
pub fn tail_window<T>(items: &[T], max_count: i64) -> &[T] {
    if max_count <= 0 {
        return &[];
    }
    let keep = usize::try_from(max_count).unwrap_or(usize::MAX).min(items.len());
    &items[items.len() - keep..]
}
