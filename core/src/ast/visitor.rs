use super::Node;

/// A depth-first pass over the tree.
///
/// `exit` runs after the node's children were visited and may replace the
/// node it receives with [`patch`]; the walker re-reads the slot, so the
/// replacement is what the caller ends up with.
pub trait Visitor {
    fn enter(&mut self, _node: &mut Node) {}
    fn exit(&mut self, node: &mut Node);
}

pub fn walk<V: Visitor + ?Sized>(node: &mut Node, visitor: &mut V) {
    visitor.enter(node);
    node.for_each_child_mut(|child| walk(child, &mut *visitor));
    visitor.exit(node);
}

/// Overwrites `slot` with `node`, keeping the slot's location.
///
/// If the replacement carries no type, the old type is kept.
pub fn patch(slot: &mut Node, mut node: Node) {
    node.span = slot.span;
    if node.ty.is_none() {
        node.ty = slot.ty.take();
    }
    *slot = node;
}
