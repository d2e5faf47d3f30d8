use core::ops::Deref;

use alloc::vec::Vec;

/// 定长槽位表，槽位数量在创建时确定
#[derive(Debug, Clone)]
pub struct SlotVec<T>(Vec<Option<T>>);

impl<T> SlotVec<T> {
    pub fn with_slots(slots: usize) -> Self {
        Self((0..slots).map(|_| None).collect())
    }

    /// 插入新元素至第一个空槽位，并返回槽位的索引；
    /// 没有空槽位时原样交还元素
    pub fn insert(&mut self, element: T) -> Result<usize, T> {
        match self.0.iter().position(Option::is_none) {
            Some(index) => {
                self.0[index] = Some(element);
                Ok(index)
            }
            None => Err(element),
        }
    }

    pub fn remove(&mut self, index: usize) -> Option<T> {
        self.0.get_mut(index)?.take()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.0.get(index)?.as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.0.get_mut(index)?.as_mut()
    }

    /// 已占用的槽位数
    pub fn occupied(&self) -> usize {
        self.0.iter().filter(|slot| slot.is_some()).count()
    }
}

impl<T> Deref for SlotVec<T> {
    type Target = [Option<T>];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::SlotVec;

    #[test]
    fn reuses_first_empty_slot() {
        let mut slots = SlotVec::with_slots(3);
        assert_eq!(slots.insert('a'), Ok(0));
        assert_eq!(slots.insert('b'), Ok(1));
        assert_eq!(slots.insert('c'), Ok(2));
        assert_eq!(slots.insert('d'), Err('d'));

        assert_eq!(slots.remove(1), Some('b'));
        assert_eq!(slots.remove(1), None);
        assert_eq!(slots.occupied(), 2);
        assert_eq!(slots.insert('e'), Ok(1));
        assert_eq!(slots.get(1), Some(&'e'));
        assert_eq!(slots.len(), 3);
    }

    #[test]
    fn out_of_range() {
        let mut slots: SlotVec<u8> = SlotVec::with_slots(1);
        assert_eq!(slots.get(5), None);
        assert_eq!(slots.get_mut(5), None);
        assert_eq!(slots.remove(5), None);
    }
}
