//! Relationship list updates
//!
//! Lists of foreign keys are never mutated in place: callers read the list,
//! compute the new list with one of these functions and write it back.
//! Two disciplines exist. Membership lists (children, holders, depositors)
//! use [`append_unique`]. Event-log lists (deposits, seeds, swaps) use
//! [`append_log`]; their ids are derived from the emitting log and are
//! unique by construction.

/// Append `id` unless the list already contains it.
pub fn append_unique(list: &[String], id: &str) -> Vec<String> {
    let mut next = list.to_vec();
    if !list.iter().any(|existing| existing == id) {
        next.push(id.to_string());
    }
    next
}

/// Append `id` to an event log.
pub fn append_log(list: &[String], id: &str) -> Vec<String> {
    let mut next = Vec::with_capacity(list.len() + 1);
    next.extend_from_slice(list);
    next.push(id.to_string());
    next
}

/// Drop every occurrence of `id`.
pub fn remove_id(list: &[String], id: &str) -> Vec<String> {
    list.iter().filter(|existing| *existing != id).cloned().collect()
}
