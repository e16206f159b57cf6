//! Navigation side effects fired by the flow machine.

/// Invalidate cached thread lists and move to the thread screen.
pub trait Navigator: Send + Sync {
    fn invalidate_thread_lists(&self);

    fn navigate_to_thread(&self, thread_id: &str, slug: &str);
}

/// Navigator for headless runs
pub struct NoNavigation;

impl Navigator for NoNavigation {
    fn invalidate_thread_lists(&self) {}
    fn navigate_to_thread(&self, _thread_id: &str, _slug: &str) {}
}
