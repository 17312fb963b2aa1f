//! Block-matching generator: scanned segments to a node tree

use crate::error::{BlockKind, CompileError, Span};
use crate::parser::ast::{Condition, EachBinding, Expr, Tag};
use crate::parser::scanner::Segment;

use super::program::{Branch, Node, Program};

/// An open block on the stack
enum Block {
    Each {
        binding: EachBinding,
        collection: Expr,
        body: Vec<Node>,
        line: usize,
        span: Span,
    },
    Conditional {
        done: Vec<Branch>,
        /// `None` once the final `{else}` has been seen
        current: Option<Condition>,
        body: Vec<Node>,
        line: usize,
        span: Span,
    },
}

impl Block {
    fn kind(&self) -> BlockKind {
        match self {
            Block::Each { .. } => BlockKind::Each,
            Block::Conditional { .. } => BlockKind::If,
        }
    }

    fn line(&self) -> usize {
        match self {
            Block::Each { line, .. } | Block::Conditional { line, .. } => *line,
        }
    }

    fn into_node(self) -> (Node, usize, Span) {
        match self {
            Block::Each {
                binding,
                collection,
                body,
                line,
                span,
            } => (
                Node::Each {
                    binding,
                    collection,
                    body,
                },
                line,
                span,
            ),
            Block::Conditional {
                mut done,
                current,
                body,
                line,
                span,
            } => {
                let otherwise = match current {
                    Some(condition) => {
                        done.push(Branch { condition, body });
                        None
                    }
                    None => Some(body),
                };
                (
                    Node::Conditional {
                        branches: done,
                        otherwise,
                    },
                    line,
                    span,
                )
            }
        }
    }
}

/// Build a [`Program`] from scanned segments, validating block structure.
pub fn generate(segments: Vec<Segment>) -> Result<Program, CompileError> {
    let mut generator = Generator::default();
    for segment in segments {
        match segment {
            Segment::Text(text) => generator.push_text(&text),
            Segment::Tag { tag, line } => generator.tag(tag.node, line, tag.span)?,
        }
    }
    generator.finish()
}

#[derive(Default)]
struct Generator {
    root: Vec<Node>,
    stack: Vec<Block>,
}

impl Generator {
    fn body(&mut self) -> &mut Vec<Node> {
        match self.stack.last_mut() {
            Some(Block::Each { body, .. }) | Some(Block::Conditional { body, .. }) => body,
            None => &mut self.root,
        }
    }

    fn push_text(&mut self, text: &str) {
        let body = self.body();
        match body.last_mut() {
            Some(Node::Text(existing)) => existing.push_str(text),
            _ => body.push(Node::Text(text.to_string())),
        }
    }

    fn tag(&mut self, tag: Tag, line: usize, span: Span) -> Result<(), CompileError> {
        match tag {
            Tag::Comment => {}
            Tag::Brace(ch) => self.push_text(ch.encode_utf8(&mut [0; 4])),
            Tag::Insert { expr, mode } => self.body().push(Node::Insert { expr, mode }),
            Tag::Include { id, params } => self.body().push(Node::Include { id, params }),
            Tag::Each {
                binding,
                collection,
            } => self.stack.push(Block::Each {
                binding,
                collection,
                body: Vec::new(),
                line,
                span,
            }),
            Tag::If(condition) => self.stack.push(Block::Conditional {
                done: Vec::new(),
                current: Some(condition),
                body: Vec::new(),
                line,
                span,
            }),
            Tag::Else(next) => match self.stack.last_mut() {
                Some(Block::Conditional {
                    done,
                    current,
                    body,
                    ..
                }) => {
                    let Some(condition) = current.take() else {
                        return Err(CompileError::ElseAfterElse { line, span });
                    };
                    done.push(Branch {
                        condition,
                        body: std::mem::take(body),
                    });
                    *current = next;
                }
                _ => return Err(CompileError::ElseWithoutIf { line, span }),
            },
            Tag::CloseIf => self.close(BlockKind::If, line, span)?,
            Tag::CloseEach => self.close(BlockKind::Each, line, span)?,
        }
        Ok(())
    }

    fn close(&mut self, found: BlockKind, line: usize, span: Span) -> Result<(), CompileError> {
        let Some(top) = self.stack.last() else {
            return Err(CompileError::UnmatchedClose {
                block: found,
                line,
                span,
            });
        };
        if top.kind() != found {
            return Err(CompileError::MismatchedClose {
                expected: top.kind(),
                found,
                line,
                opened: top.line(),
                span,
            });
        }
        if let Some(block) = self.stack.pop() {
            let (node, _, _) = block.into_node();
            self.body().push(node);
        }
        Ok(())
    }

    fn finish(mut self) -> Result<Program, CompileError> {
        if let Some(block) = self.stack.pop() {
            let block_kind = block.kind();
            let (_, line, span) = block.into_node();
            return Err(CompileError::Unclosed {
                block: block_kind,
                line,
                span,
            });
        }
        Ok(Program { nodes: self.root })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::scanner::tokenize;

    fn compile(source: &str) -> Result<Program, CompileError> {
        generate(tokenize(source))
    }

    #[test]
    fn test_text_and_braces_merge() {
        let program = compile("a{{}b{}}c{* gone *}").expect("Should compile");
        assert_eq!(program.nodes, vec![Node::Text("a{b}c".to_string())]);
    }

    #[test]
    fn test_else_chain_is_one_conditional() {
        let program = compile("{if a}1{else-if b}2{else}3{/if}").expect("Should compile");
        assert_eq!(program.nodes.len(), 1);
        match &program.nodes[0] {
            Node::Conditional {
                branches,
                otherwise,
            } => {
                assert_eq!(branches.len(), 2);
                assert_eq!(otherwise, &Some(vec![Node::Text("3".to_string())]));
            }
            other => panic!("Expected conditional, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_blocks() {
        let program =
            compile("{each items}{if-first}F{/if}{each $.tags}t{/each}{/each}").expect("Should compile");
        match &program.nodes[0] {
            Node::Each { body, .. } => assert_eq!(body.len(), 2),
            other => panic!("Expected each, got {:?}", other),
        }
    }

    #[test]
    fn test_unclosed_each() {
        let err = compile("line1\n{each items}{x}").unwrap_err();
        assert!(matches!(
            err,
            CompileError::Unclosed {
                block: BlockKind::Each,
                line: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_stray_close_if() {
        let err = compile("text{/if}").unwrap_err();
        assert!(matches!(
            err,
            CompileError::UnmatchedClose {
                block: BlockKind::If,
                line: 1,
                ..
            }
        ));
        assert!(err.to_string().contains("if"));
    }

    #[test]
    fn test_mismatched_close() {
        let err = compile("{each xs}{if a}{/each}{/if}").unwrap_err();
        assert!(matches!(
            err,
            CompileError::MismatchedClose {
                expected: BlockKind::If,
                found: BlockKind::Each,
                ..
            }
        ));
    }

    #[test]
    fn test_else_errors() {
        assert!(matches!(
            compile("{else}").unwrap_err(),
            CompileError::ElseWithoutIf { .. }
        ));
        assert!(matches!(
            compile("{each xs}{else}{/each}").unwrap_err(),
            CompileError::ElseWithoutIf { .. }
        ));
        assert!(matches!(
            compile("{if a}{else}{else}{/if}").unwrap_err(),
            CompileError::ElseAfterElse { .. }
        ));
    }

    #[test]
    fn test_malformed_block_tag_is_text() {
        let program = compile("{each}{if}").expect("Should compile");
        assert_eq!(program.nodes.len(), 2);
        assert!(matches!(program.nodes[0], Node::Insert { .. }));
    }

    #[test]
    fn test_dump() {
        let program = compile("Hi {name}{each v at i in xs}{raw v}{/each}{if-not-empty xs}y{else}n{/if}{tmpl row x: 1}")
            .expect("Should compile");
        insta::assert_snapshot!(program.to_string(), @r###"
        text "Hi "
        insert name
        each v at i in xs
          raw v
        end
        if-not-empty xs
          text "y"
        else
          text "n"
        end
        include "row" x: 1
        "###);
    }
}
