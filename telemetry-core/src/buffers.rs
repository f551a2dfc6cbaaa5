// Fixed-capacity rolling window for one time-series channel.
// Invariants: len <= capacity; overflow drops the oldest entry; order is arrival order.

#[derive(Debug, Clone)]
pub struct TimeSeriesBuffer<T> {
    buf: Vec<T>,
    cap: usize,
    head: usize,
    len: usize,
}

impl<T: Clone> TimeSeriesBuffer<T> {
    pub fn new(cap: usize) -> Self {
        Self {
            buf: Vec::with_capacity(cap),
            cap,
            head: 0,
            len: 0,
        }
    }

    pub fn append(&mut self, item: T) {
        if self.cap == 0 {
            return;
        }
        if self.len < self.cap {
            self.buf.push(item);
            self.len += 1;
        } else {
            self.buf[self.head] = item;
            self.head = (self.head + 1) % self.cap;
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn snapshot(&self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.len);
        if self.len == 0 {
            return out;
        }

        if self.len < self.cap {
            out.extend(self.buf.iter().cloned());
            return out;
        }

        out.extend(self.buf[self.head..].iter().cloned());
        out.extend(self.buf[..self.head].iter().cloned());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn keeps_append_order_below_capacity() {
        let mut buffer = TimeSeriesBuffer::new(4);
        buffer.append(1);
        buffer.append(2);
        assert_eq!(buffer.snapshot(), vec![1, 2]);
    }

    #[test]
    fn drops_oldest_on_overflow() {
        let mut buffer = TimeSeriesBuffer::new(3);
        for value in 1..=5 {
            buffer.append(value);
        }
        assert_eq!(buffer.snapshot(), vec![3, 4, 5]);
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn snapshot_is_detached_from_later_appends() {
        let mut buffer = TimeSeriesBuffer::new(2);
        buffer.append("a");
        let before = buffer.snapshot();
        buffer.append("b");
        buffer.append("c");
        assert_eq!(before, vec!["a"]);
        assert_eq!(buffer.snapshot(), vec!["b", "c"]);
    }

    #[test]
    fn zero_capacity_retains_nothing() {
        let mut buffer = TimeSeriesBuffer::new(0);
        buffer.append(1);
        assert!(buffer.is_empty());
        assert!(buffer.snapshot().is_empty());
    }

    proptest! {
        #[test]
        fn retains_last_c_in_append_order(
            cap in 1usize..64,
            values in proptest::collection::vec(any::<u32>(), 0..256),
        ) {
            let mut buffer = TimeSeriesBuffer::new(cap);
            for value in &values {
                buffer.append(*value);
            }
            let expected_len = values.len().min(cap);
            let snapshot = buffer.snapshot();
            prop_assert_eq!(snapshot.len(), expected_len);
            prop_assert_eq!(&snapshot[..], &values[values.len() - expected_len..]);
        }
    }
}
