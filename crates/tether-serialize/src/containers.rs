//! Container rules: a compact `auto_size` element count, then one slot
//! per element. Ordered containers preserve order across the wire; hash
//! containers re-insert in decoded order. Fixed arrays carry no count
//! because the length is part of the type.

use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap, HashSet, LinkedList, VecDeque};
use std::hash::Hash;

use crate::{Decode, DecodeError, Encode, InputArchive, OutputArchive};

fn encode_seq<'a, T: Encode + 'a>(
    len: usize,
    items: impl Iterator<Item = &'a T>,
    out: &mut OutputArchive,
) {
    out.put_auto_size(len as u64);
    for item in items {
        out.slot(item);
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, out: &mut OutputArchive) {
        encode_seq(self.len(), self.iter(), out);
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(input: &mut InputArchive<'_>) -> Result<Self, DecodeError> {
        let len = input.take_auto_size()? as usize;
        let mut items = Vec::new();
        for _ in 0..len {
            items.push(input.slot()?);
        }
        Ok(items)
    }
}

impl<T: Encode> Encode for [T] {
    fn encode(&self, out: &mut OutputArchive) {
        encode_seq(self.len(), self.iter(), out);
    }
}

impl<T: Encode> Encode for VecDeque<T> {
    fn encode(&self, out: &mut OutputArchive) {
        encode_seq(self.len(), self.iter(), out);
    }
}

impl<T: Decode> Decode for VecDeque<T> {
    fn decode(input: &mut InputArchive<'_>) -> Result<Self, DecodeError> {
        Ok(Vec::<T>::decode(input)?.into())
    }
}

impl<T: Encode> Encode for LinkedList<T> {
    fn encode(&self, out: &mut OutputArchive) {
        encode_seq(self.len(), self.iter(), out);
    }
}

impl<T: Decode> Decode for LinkedList<T> {
    fn decode(input: &mut InputArchive<'_>) -> Result<Self, DecodeError> {
        let len = input.take_auto_size()? as usize;
        let mut items = LinkedList::new();
        for _ in 0..len {
            items.push_back(input.slot()?);
        }
        Ok(items)
    }
}

impl<T: Encode + Ord> Encode for BinaryHeap<T> {
    fn encode(&self, out: &mut OutputArchive) {
        encode_seq(self.len(), self.iter(), out);
    }
}

impl<T: Decode + Ord> Decode for BinaryHeap<T> {
    fn decode(input: &mut InputArchive<'_>) -> Result<Self, DecodeError> {
        let len = input.take_auto_size()? as usize;
        let mut items = BinaryHeap::with_capacity(len);
        for _ in 0..len {
            items.push(input.slot()?);
        }
        Ok(items)
    }
}

impl<T: Encode> Encode for BTreeSet<T> {
    fn encode(&self, out: &mut OutputArchive) {
        encode_seq(self.len(), self.iter(), out);
    }
}

impl<T: Decode + Ord> Decode for BTreeSet<T> {
    fn decode(input: &mut InputArchive<'_>) -> Result<Self, DecodeError> {
        let len = input.take_auto_size()? as usize;
        let mut items = BTreeSet::new();
        for _ in 0..len {
            items.insert(input.slot()?);
        }
        Ok(items)
    }
}

impl<T: Encode> Encode for HashSet<T> {
    fn encode(&self, out: &mut OutputArchive) {
        encode_seq(self.len(), self.iter(), out);
    }
}

impl<T: Decode + Eq + Hash> Decode for HashSet<T> {
    fn decode(input: &mut InputArchive<'_>) -> Result<Self, DecodeError> {
        let len = input.take_auto_size()? as usize;
        let mut items = HashSet::with_capacity(len);
        for _ in 0..len {
            items.insert(input.slot()?);
        }
        Ok(items)
    }
}

// Map entries travel as (key, value) pairs; the pair rule length-prefixes
// each side that is not a fixed-width fundamental.
impl<K: Encode, V: Encode> Encode for BTreeMap<K, V> {
    fn encode(&self, out: &mut OutputArchive) {
        out.put_auto_size(self.len() as u64);
        for (key, value) in self {
            out.slot(&(key, value));
        }
    }
}

impl<K: Decode + Ord, V: Decode> Decode for BTreeMap<K, V> {
    fn decode(input: &mut InputArchive<'_>) -> Result<Self, DecodeError> {
        let len = input.take_auto_size()? as usize;
        let mut items = BTreeMap::new();
        for _ in 0..len {
            let (key, value) = input.slot::<(K, V)>()?;
            items.insert(key, value);
        }
        Ok(items)
    }
}

impl<K: Encode, V: Encode> Encode for HashMap<K, V> {
    fn encode(&self, out: &mut OutputArchive) {
        out.put_auto_size(self.len() as u64);
        for (key, value) in self {
            out.slot(&(key, value));
        }
    }
}

impl<K: Decode + Eq + Hash, V: Decode> Decode for HashMap<K, V> {
    fn decode(input: &mut InputArchive<'_>) -> Result<Self, DecodeError> {
        let len = input.take_auto_size()? as usize;
        let mut items = HashMap::with_capacity(len);
        for _ in 0..len {
            let (key, value) = input.slot::<(K, V)>()?;
            items.insert(key, value);
        }
        Ok(items)
    }
}

impl<T: Encode, const N: usize> Encode for [T; N] {
    fn encode(&self, out: &mut OutputArchive) {
        for item in self {
            out.slot(item);
        }
    }
}

impl<T: Decode, const N: usize> Decode for [T; N] {
    fn decode(input: &mut InputArchive<'_>) -> Result<Self, DecodeError> {
        let mut items = Vec::with_capacity(N);
        for _ in 0..N {
            items.push(input.slot()?);
        }
        match items.try_into() {
            Ok(array) => Ok(array),
            Err(_) => unreachable!("exactly N elements collected"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{decode, encode};

    #[test]
    fn vec_of_plain_roundtrip() {
        let values = vec![1u32, 200, 70_000];
        assert_eq!(decode::<Vec<u32>>(&encode(&values)).unwrap(), values);
    }

    #[test]
    fn vec_of_strings_roundtrip() {
        let values = vec!["a".to_string(), String::new(), "longer entry".to_string()];
        assert_eq!(decode::<Vec<String>>(&encode(&values)).unwrap(), values);
    }

    #[test]
    fn empty_containers() {
        assert_eq!(encode(&Vec::<u64>::new()), vec![0]);
        assert_eq!(decode::<Vec<u64>>(&[0]).unwrap(), Vec::<u64>::new());
    }

    #[test]
    fn deque_and_list_preserve_order() {
        let deque: VecDeque<i32> = [3, 1, 2].into_iter().collect();
        assert_eq!(decode::<VecDeque<i32>>(&encode(&deque)).unwrap(), deque);

        let list: LinkedList<String> = ["x".to_string(), "y".to_string()].into_iter().collect();
        assert_eq!(decode::<LinkedList<String>>(&encode(&list)).unwrap(), list);
    }

    #[test]
    fn heap_holds_the_same_elements() {
        let heap: BinaryHeap<u32> = [5, 9, 1].into_iter().collect();
        let back: BinaryHeap<u32> = decode(&encode(&heap)).unwrap();
        assert_eq!(back.into_sorted_vec(), vec![1, 5, 9]);
    }

    #[test]
    fn sets_roundtrip() {
        let btree: BTreeSet<String> = ["b".to_string(), "a".to_string()].into_iter().collect();
        assert_eq!(decode::<BTreeSet<String>>(&encode(&btree)).unwrap(), btree);

        let hash: HashSet<u64> = [7, 8, 9].into_iter().collect();
        assert_eq!(decode::<HashSet<u64>>(&encode(&hash)).unwrap(), hash);
    }

    #[test]
    fn maps_roundtrip() {
        let mut btree = BTreeMap::new();
        btree.insert("one".to_string(), 1u32);
        btree.insert("two".to_string(), 2);
        assert_eq!(decode::<BTreeMap<String, u32>>(&encode(&btree)).unwrap(), btree);

        let mut hash = HashMap::new();
        hash.insert(1u16, "one".to_string());
        hash.insert(2, "two".to_string());
        assert_eq!(decode::<HashMap<u16, String>>(&encode(&hash)).unwrap(), hash);
    }

    #[test]
    fn fixed_array_has_no_count_prefix() {
        let values = [1u8, 2, 3, 4];
        assert_eq!(encode(&values), vec![1, 2, 3, 4]);
        assert_eq!(decode::<[u8; 4]>(&encode(&values)).unwrap(), values);
    }

    #[test]
    fn truncated_container_fails() {
        let bytes = encode(&vec![1u32, 2, 3]);
        assert!(decode::<Vec<u32>>(&bytes[..bytes.len() - 1]).is_err());
    }
}
