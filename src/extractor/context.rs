use super::AlignmentAttributes;

/// Stack of the alignment milestones enclosing the node being visited.
/// The innermost milestone describes the finest alignment, so it wins.
#[derive(Debug, Default)]
pub struct AlignmentContext {
    stack: Vec<AlignmentAttributes>,
}

impl AlignmentContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, attributes: AlignmentAttributes) {
        self.stack.push(attributes);
    }

    pub fn pop(&mut self) -> Option<AlignmentAttributes> {
        self.stack.pop()
    }

    pub fn innermost(&self) -> Option<&AlignmentAttributes> {
        self.stack.last()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(strong: &str) -> AlignmentAttributes {
        AlignmentAttributes {
            strong: Some(strong.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_innermost_wins() {
        let mut context = AlignmentContext::new();
        assert!(context.innermost().is_none());
        context.push(attrs("G1"));
        context.push(attrs("G2"));
        assert_eq!(context.innermost().unwrap().strong.as_deref(), Some("G2"));
        assert_eq!(context.depth(), 2);
        context.pop();
        assert_eq!(context.innermost().unwrap().strong.as_deref(), Some("G1"));
    }
}
