//! Order assignment for new and moved tasks, and rewriting of the order's
//! on-disk representation.

use crate::config::Config;
use crate::meta::{self, ORDER_KEY};
use crate::syntax::{TaskKind, format_order, list_body_indent};
use crate::task::Task;

/// Gap between neighbouring orders handed out at list edges.
pub const ORDER_STEP: f64 = 10.0;

/// Order for a new task, given the target list sorted as displayed.
///
/// An explicit order always wins. Otherwise `keep_empty_priority` yields no
/// order, an empty list yields `0`, and the edges step away from the first or
/// last task.
#[must_use]
pub fn assign_order(list: &[Task], explicit: Option<f64>, config: &Config, to_top: bool) -> Option<f64> {
    if explicit.is_some() {
        return explicit;
    }
    if config.keep_empty_priority {
        return None;
    }
    let (Some(first), Some(last)) = (list.first(), list.last()) else {
        return Some(0.0);
    };
    if to_top {
        Some(first.order.unwrap_or(0.0) - ORDER_STEP)
    } else {
        Some(last.order.unwrap_or(0.0) + ORDER_STEP)
    }
}

/// Result of placing a task at a position in a list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderPlan {
    /// Order for the placed task.
    pub order: Option<f64>,
    /// Orders to write to other tasks, as `(index in list, order)`.
    pub renumber: Vec<(usize, f64)>,
}

/// Order for `moved` placed at `pos` of `list`.
///
/// `list` is the target list, sorted and without the moved task. The order is
/// the midpoint of the neighbours. Between equal neighbours the task shares
/// their order when the text tie-break already puts it at `pos`; otherwise
/// only that equal-order group is spread out. Order-less tasks sort after
/// ordered ones, so placing a task among them numbers the order-less run as
/// well.
#[must_use]
pub fn order_for_position(list: &[Task], moved: &Task, pos: usize, config: &Config) -> OrderPlan {
    if config.keep_empty_priority {
        return OrderPlan::default();
    }
    let pos = pos.min(list.len());
    let first_unordered = list
        .iter()
        .position(|task| task.order.is_none())
        .unwrap_or(list.len());

    if pos > first_unordered || (pos == first_unordered && pos < list.len()) {
        return number_unordered_run(list, pos, first_unordered);
    }
    if pos == list.len() && first_unordered < list.len() {
        return number_unordered_run(list, pos, first_unordered);
    }

    let before = pos.checked_sub(1).and_then(|idx| list.get(idx)).and_then(|t| t.order);
    let after = list.get(pos).and_then(|t| t.order);
    let order = match (before, after) {
        (Some(b), Some(a)) if b.total_cmp(&a).is_eq() => return place_in_group(list, moved, pos, b),
        (Some(b), Some(a)) => (b + a) / 2.0,
        (None, Some(a)) => a - ORDER_STEP,
        (Some(b), None) => b + ORDER_STEP,
        (None, None) => 0.0,
    };
    OrderPlan {
        order: Some(order),
        renumber: Vec::new(),
    }
}

fn place_in_group(list: &[Task], moved: &Task, pos: usize, order: f64) -> OrderPlan {
    let same = |task: &Task| task.order.is_some_and(|other| other.total_cmp(&order).is_eq());
    let start = list[..pos].iter().rposition(|task| !same(task)).map_or(0, |idx| idx + 1);
    let end = list[pos..]
        .iter()
        .position(|task| !same(task))
        .map_or(list.len(), |idx| pos + idx);
    let group = &list[start..end];

    let slot = start + group.iter().filter(|task| task.text < moved.text).count();
    if slot == pos && group.iter().all(|task| task.text != moved.text) {
        return OrderPlan {
            order: Some(order),
            renumber: Vec::new(),
        };
    }

    let lower = start.checked_sub(1).and_then(|idx| list.get(idx)).and_then(|t| t.order);
    let upper = list.get(end).and_then(|t| t.order);
    let (first, step) = match upper {
        Some(upper) => {
            let lower = lower.unwrap_or(order - ORDER_STEP);
            let slots = f64::from(u32::try_from(group.len() + 2).unwrap_or(u32::MAX));
            let step = (upper - lower) / slots;
            (lower + step, step)
        }
        None => (order, ORDER_STEP),
    };
    let mut next = first;
    let mut plan = OrderPlan::default();
    for idx in start..=end {
        if idx == pos {
            plan.order = Some(next);
            next += step;
        }
        if idx < end {
            plan.renumber.push((idx, next));
            next += step;
        }
    }
    plan
}

fn number_unordered_run(list: &[Task], pos: usize, first_unordered: usize) -> OrderPlan {
    let base = first_unordered
        .checked_sub(1)
        .and_then(|idx| list.get(idx))
        .and_then(|t| t.order);
    let mut next = base.map_or(0.0, |b| b + ORDER_STEP);
    let mut plan = OrderPlan::default();
    for idx in first_unordered..=list.len() {
        if idx == pos {
            plan.order = Some(next);
            next += ORDER_STEP;
        }
        if idx < list.len() {
            plan.renumber.push((idx, next));
            next += ORDER_STEP;
        }
    }
    plan
}

/// Write `order` into `task`, choosing the representation from `config`.
///
/// Inline mode writes `:<order>` on the token and drops any `order:` entry.
/// Metadata mode rewrites every `order:` entry in the title and body, or
/// appends one when there is none, and clears the inline literal. An appended
/// markdown entry is indented to the body of a list item. `None` leaves the
/// task untouched.
pub fn apply_order(task: &mut Task, order: Option<f64>, config: &Config) {
    let Some(order) = order else {
        return;
    };
    let literal = format_order(order);
    task.order = Some(order);
    if config.order_meta {
        if task.kind == TaskKind::Hash {
            task.kind = TaskKind::HashMeta;
        }
        task.order_literal = None;
        write_order_meta(task, &literal);
    } else {
        if task.kind == TaskKind::HashMeta {
            task.kind = TaskKind::Hash;
        }
        task.order_literal = Some(literal);
        task.has_colon = true;
        strip_order_meta(task);
    }
    task.refresh_details();
    task.order = Some(order);
}

fn write_order_meta(task: &mut Task, value: &str) {
    let mut replaced = false;
    if let Some(text) = meta::replace_order_entry(&task.text, value) {
        task.text = text;
        replaced = true;
    }
    for line in &mut task.description {
        if let Some(updated) = meta::replace_order_entry(line, value) {
            *line = updated;
            replaced = true;
        }
    }
    if replaced {
        return;
    }

    let entry = format!("{ORDER_KEY}:{value}");
    let last_comment = task
        .description
        .iter()
        .rposition(|line| line.contains("<!--") && line.trim_end().ends_with("-->"));
    if let Some(idx) = last_comment {
        let line = &task.description[idx];
        let close = line.rfind("-->").unwrap_or(line.len());
        let head = line[..close].trim_end();
        let updated = format!("{head} {entry} {}", &line[close..]);
        task.description[idx] = updated;
    } else if task.source.language == crate::language::MARKDOWN.name
        || task.source.language == crate::language::PLAIN_TEXT.name
    {
        let pad = list_body_indent(task.raw_title()).unwrap_or(0);
        task.description.push(format!("{:pad$}<!-- {entry} -->", ""));
    } else {
        task.description.push(entry);
    }
}

fn strip_order_meta(task: &mut Task) {
    if let Some(text) = meta::strip_order_entry(&task.text) {
        task.text = text.trim_end().to_owned();
    }
    task.description = std::mem::take(&mut task.description)
        .into_iter()
        .filter_map(|line| match meta::strip_order_entry(&line) {
            Some(stripped) if meta::is_empty_comment(&stripped) || stripped.trim().is_empty() => None,
            Some(stripped) => Some(stripped),
            None => Some(line),
        })
        .collect();
}
