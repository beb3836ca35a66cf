/// The VM operand stack.
///
/// Popping an empty stack means the compiler emitted unbalanced code, so the
/// accessors treat it as unreachable rather than as a runtime error.
pub struct Stack<T> {
    items: Vec<T>,
}

impl<T> Stack<T> {
    /// Creates an empty stack with room for `capacity` elements.
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity.min(256)),
        }
    }

    #[inline]
    pub fn push(&mut self, value: T) {
        self.items.push(value);
    }

    /// Removes and returns the top value.
    #[inline]
    pub fn pop(&mut self) -> T {
        match self.items.pop() {
            Some(value) => value,
            None => unreachable!("operand stack underflow"),
        }
    }

    /// Returns a reference to the top value.
    #[inline]
    pub fn peek(&self) -> &T {
        match self.items.last() {
            Some(value) => value,
            None => unreachable!("operand stack underflow"),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Removes the top `n` elements and returns them bottom to top.
    ///
    /// ```ignore
    /// let mut stack = Stack::new(8);
    /// stack.push(10);
    /// stack.push(20);
    /// stack.push(30);
    /// assert_eq!(stack.pop_n(2), vec![20, 30]);
    /// ```
    pub fn pop_n(&mut self, n: usize) -> Vec<T> {
        debug_assert!(n <= self.items.len(), "operand stack underflow");
        let at = self.items.len().saturating_sub(n);
        self.items.split_off(at)
    }

    /// The elements from bottom to top.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}
