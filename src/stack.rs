//! Stack growth for the recursive passes
//!
//! Parsing, resolving, evaluating and comparing values all recurse on the
//! shape of the input. Hosts may run the interpreter on small thread stacks,
//! so every recursive entry point goes through [`ensure_sufficient_stack`].

/// Grow when less than this much stack remains (128KB)
const RED_ZONE: usize = 128 * 1024;

/// Size of each newly allocated stack segment (1MB)
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Run `f`, first moving to a fresh stack segment if the current one is
/// close to exhausted.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn depth(n: u64) -> u64 {
        ensure_sufficient_stack(|| if n == 0 { 0 } else { depth(n - 1) + 1 })
    }

    #[test]
    fn test_deep_recursion_on_small_thread() {
        let handle = std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(|| depth(50_000))
            .unwrap();
        assert_eq!(handle.join().unwrap(), 50_000);
    }

    #[test]
    fn test_passes_result_through() {
        let result: Result<i32, &str> = ensure_sufficient_stack(|| Ok(7));
        assert_eq!(result, Ok(7));
    }
}
