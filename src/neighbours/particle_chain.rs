/// Walks a singly linked particle chain: `head`, `next[head]`, ... until `None`.
pub struct ChainIter<'a> {
    current: Option<usize>,
    next: &'a [Option<usize>],
}

impl<'a> ChainIter<'a> {
    pub fn new(head: Option<usize>, next: &'a [Option<usize>]) -> Self {
        Self { current: head, next }
    }
}

impl Iterator for ChainIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let i = self.current?;
        self.current = self.next[i];
        Some(i)
    }
}
