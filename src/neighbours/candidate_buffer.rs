use crate::utils::TreeError;

/// Bounded list of neighbour candidate ids filled by a single query.
///
/// Pushing past the capacity does not store the id, but keeps counting, so that after the
/// query [`CandidateBuffer::finish`] can report how large the buffer would have had to be.
///
/// # Examples
///
/// ```
/// use rs_sph_tree::neighbours::CandidateBuffer;
/// use rs_sph_tree::utils::TreeError;
///
/// let mut buffer = CandidateBuffer::new(2);
/// buffer.push(4);
/// buffer.push(7);
/// assert!(buffer.finish().is_ok());
///
/// buffer.push(9);
/// assert_eq!(
///     buffer.finish(),
///     Err(TreeError::CandidateOverflow { required: 3, capacity: 2 })
/// );
/// assert_eq!(buffer.as_slice(), &[4, 7]);
/// ```
#[derive(Debug, Clone)]
pub struct CandidateBuffer {
    ids: Vec<usize>,
    capacity: usize,
    required: usize,
}

impl CandidateBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            ids: Vec::with_capacity(capacity),
            capacity,
            required: 0,
        }
    }

    /// Forgets the previous query, keeping the allocation.
    pub fn clear(&mut self) {
        self.ids.clear();
        self.required = 0;
    }

    #[inline]
    pub fn push(&mut self, id: usize) {
        self.required += 1;
        if self.ids.len() < self.capacity {
            self.ids.push(id);
        }
    }

    /// Ends a query: an error if anything was dropped.
    pub fn finish(&self) -> Result<(), TreeError> {
        if self.required > self.capacity {
            return Err(TreeError::CandidateOverflow { required: self.required, capacity: self.capacity });
        }
        Ok(())
    }

    /// Raises the capacity to at least `capacity` and clears the contents.
    pub fn grow(&mut self, capacity: usize) {
        if capacity > self.capacity {
            self.ids.reserve(capacity - self.ids.len());
            self.capacity = capacity;
        }
        self.clear();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of ids counted by the current query, stored or not.
    pub fn required(&self) -> usize {
        self.required
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.ids
    }
}
