use crate::database::models::CommentListingRecord;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// One comment plus its ordered replies. Sibling order mirrors the input
/// order, which already encodes (score descending, creation time ascending).
#[derive(Debug, Clone, Serialize)]
pub struct CommentNode {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub parent_id: Option<i64>,
    pub author: String,
    pub content: String,
    pub score: i64,
    pub created_at: String,
    pub children: Vec<CommentNode>,
}

impl CommentNode {
    fn from_row(row: CommentListingRecord, children: Vec<CommentNode>) -> Self {
        Self {
            id: row.comment.id,
            post_id: row.comment.post_id,
            user_id: row.comment.user_id,
            parent_id: row.comment.parent_id,
            author: row.author,
            content: row.comment.content,
            score: row.comment.score,
            created_at: row.comment.created_at,
            children,
        }
    }
}

/// Builds the reply forest for one post from its flat, pre-sorted comment
/// list. A comment whose parent is not part of the result set (parent
/// deleted) is reparented to the root level rather than dropped.
pub fn build_comment_tree(rows: Vec<CommentListingRecord>) -> Vec<CommentNode> {
    let known_ids: HashSet<i64> = rows.iter().map(|row| row.comment.id).collect();

    let mut roots: Vec<usize> = Vec::new();
    let mut children_of: HashMap<i64, Vec<usize>> = HashMap::new();
    for (idx, row) in rows.iter().enumerate() {
        match row.comment.parent_id {
            Some(parent_id) if known_ids.contains(&parent_id) => {
                children_of.entry(parent_id).or_default().push(idx);
            }
            _ => roots.push(idx),
        }
    }

    let mut slots: Vec<Option<CommentListingRecord>> = rows.into_iter().map(Some).collect();
    build_level(&roots, &mut slots, &children_of)
}

fn build_level(
    indices: &[usize],
    slots: &mut Vec<Option<CommentListingRecord>>,
    children_of: &HashMap<i64, Vec<usize>>,
) -> Vec<CommentNode> {
    let mut nodes = Vec::with_capacity(indices.len());
    for &idx in indices {
        let Some(row) = slots[idx].take() else {
            continue;
        };
        let child_indices = children_of
            .get(&row.comment.id)
            .cloned()
            .unwrap_or_default();
        let children = build_level(&child_indices, slots, children_of);
        nodes.push(CommentNode::from_row(row, children));
    }
    nodes
}

/// A node flattened back out with its nesting depth, which is what the
/// detail page template iterates over.
#[derive(Debug, Clone)]
pub struct FlatComment {
    pub depth: usize,
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub author: String,
    pub content: String,
    pub score: i64,
    pub created_at: String,
}

pub fn flatten_comment_tree(forest: &[CommentNode]) -> Vec<FlatComment> {
    let mut flat = Vec::new();
    flatten_into(forest, 0, &mut flat);
    flat
}

fn flatten_into(nodes: &[CommentNode], depth: usize, out: &mut Vec<FlatComment>) {
    for node in nodes {
        out.push(FlatComment {
            depth,
            id: node.id,
            post_id: node.post_id,
            user_id: node.user_id,
            author: node.author.clone(),
            content: node.content.clone(),
            score: node.score,
            created_at: node.created_at.clone(),
        });
        flatten_into(&node.children, depth + 1, out);
    }
}
