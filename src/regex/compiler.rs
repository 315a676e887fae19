// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under Mozilla Public License (MPL) 2.0.

//! [`Ast`] to [`Program`].
//!
//! Thompson construction: alternation and loops become `Split`/`Jump` pairs, counted
//! repetition is expanded into copies of the repeated sub-program.

use log::debug;

use crate::config::MAX_PROGRAM_LEN;
use crate::errors::KernelError;

use super::parser::{self, Assertion, Ast};
use super::program::{CharClass, Inst, Program};
use super::RegexFlags;

struct Compiler<'p> {
    pattern: &'p str,
    flags: RegexFlags,
    insts: Vec<Inst>,
    classes: Vec<CharClass>,
}

/// Parses and compiles `pattern`. Flags from a leading `(?ims)` group are added to
/// `flags`.
///
/// # Errors
/// `MalformedPattern` for syntax errors and for programs longer than
/// [`MAX_PROGRAM_LEN`].
pub fn compile(pattern: &str, flags: RegexFlags) -> Result<Program, KernelError> {
    let parsed = parser::parse(pattern)?;
    let mut c = Compiler {
        pattern,
        flags: flags.union(parsed.inline_flags),
        insts: Vec::new(),
        classes: Vec::new(),
    };
    c.push(Inst::Save(0))?;
    c.emit(&parsed.ast)?;
    c.push(Inst::Save(1))?;
    c.push(Inst::Match)?;

    let program = Program {
        insts: c.insts,
        classes: c.classes,
        slots: 2 * (parsed.groups + 1),
        start: 0,
    };
    program.validate().map_err(|reason| KernelError::MalformedPattern {
        pattern: pattern.to_string(),
        position: 0,
        reason,
    })?;
    debug!(
        "compiled pattern {:?}: {} instructions, {} classes, {} groups",
        pattern,
        program.len(),
        program.classes.len(),
        parsed.groups
    );
    Ok(program)
}

impl<'p> Compiler<'p> {
    fn push(&mut self, inst: Inst) -> Result<usize, KernelError> {
        if self.insts.len() >= MAX_PROGRAM_LEN {
            return Err(KernelError::MalformedPattern {
                pattern: self.pattern.to_string(),
                position: self.pattern.len(),
                reason: format!("compiled program exceeds {} instructions", MAX_PROGRAM_LEN),
            });
        }
        self.insts.push(inst);
        Ok(self.insts.len() - 1)
    }

    #[inline]
    fn next_pc(&self) -> usize {
        self.insts.len()
    }

    /// Points the split at `pc` to `body` and `exit`, ordered by greediness.
    fn set_split(&mut self, pc: usize, body: usize, exit: usize, greedy: bool) {
        self.insts[pc] = if greedy {
            Inst::Split { primary: body, secondary: exit }
        } else {
            Inst::Split { primary: exit, secondary: body }
        };
    }

    fn hole(&mut self) -> Result<usize, KernelError> {
        self.push(Inst::Split { primary: 0, secondary: 0 })
    }

    fn emit(&mut self, ast: &Ast) -> Result<(), KernelError> {
        let fold = self.flags.ignore_case;
        match ast {
            Ast::Empty => {}
            Ast::Literal(ch) => {
                self.push(Inst::Char { ch: *ch, fold })?;
            }
            Ast::Any => {
                self.push(Inst::Any { newline: self.flags.dot_all })?;
            }
            Ast::Class(set) => {
                self.classes.push(CharClass::new(set));
                let class = self.classes.len() - 1;
                self.push(Inst::Class { class, fold })?;
            }
            Ast::Assert(a) => {
                let a = match (a, self.flags.multiline) {
                    (Assertion::Caret, true) => Assertion::StartLine,
                    (Assertion::Dollar, true) => Assertion::EndLine,
                    (Assertion::Caret, false) => Assertion::StartText,
                    (Assertion::Dollar, false) => Assertion::EndText,
                    (other, _) => *other,
                };
                self.push(Inst::Assert(a))?;
            }
            Ast::Group { index: Some(k), node } => {
                self.push(Inst::Save(2 * k))?;
                self.emit(node)?;
                self.push(Inst::Save(2 * k + 1))?;
            }
            Ast::Group { index: None, node } => self.emit(node)?,
            Ast::Concat(items) => {
                for item in items {
                    self.emit(item)?;
                }
            }
            Ast::Alternate(branches) => self.emit_alternation(branches)?,
            Ast::Repeat { node, min, max, greedy } => {
                self.emit_repeat(node, *min, *max, *greedy)?
            }
        }
        Ok(())
    }

    fn emit_alternation(&mut self, branches: &[Ast]) -> Result<(), KernelError> {
        let mut jumps = Vec::with_capacity(branches.len());
        let last = branches.len().saturating_sub(1);
        for (k, branch) in branches.iter().enumerate() {
            if k == last {
                self.emit(branch)?;
                break;
            }
            let split = self.hole()?;
            self.emit(branch)?;
            jumps.push(self.push(Inst::Jump(0))?);
            let next = self.next_pc();
            self.set_split(split, split + 1, next, true);
        }
        let end = self.next_pc();
        for j in jumps {
            self.insts[j] = Inst::Jump(end);
        }
        Ok(())
    }

    fn emit_repeat(
        &mut self,
        node: &Ast,
        min: u32,
        max: Option<u32>,
        greedy: bool,
    ) -> Result<(), KernelError> {
        match max {
            // x{n,}: n-1 copies, then a loop whose body runs at least once.
            None if min > 0 => {
                for _ in 1..min {
                    self.emit(node)?;
                }
                let body = self.next_pc();
                self.emit(node)?;
                let split = self.hole()?;
                let exit = self.next_pc();
                self.set_split(split, body, exit, greedy);
            }
            None => {
                let split = self.hole()?;
                self.emit(node)?;
                self.push(Inst::Jump(split))?;
                let exit = self.next_pc();
                self.set_split(split, split + 1, exit, greedy);
            }
            Some(max) => {
                for _ in 0..min {
                    self.emit(node)?;
                }
                let mut holes = Vec::with_capacity((max - min) as usize);
                for _ in min..max {
                    holes.push(self.hole()?);
                    self.emit(node)?;
                }
                let exit = self.next_pc();
                for h in holes {
                    self.set_split(h, h + 1, exit, greedy);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_literal_program() {
        let p = compile("ab", RegexFlags::default()).unwrap();
        assert_eq!(
            p.insts,
            vec![
                Inst::Save(0),
                Inst::Char { ch: 'a', fold: false },
                Inst::Char { ch: 'b', fold: false },
                Inst::Save(1),
                Inst::Match,
            ]
        );
        assert_eq!(p.group_count(), 0);
    }

    #[test]
    fn test_compile_star_loop() {
        let p = compile("a*?", RegexFlags::default()).unwrap();
        assert_eq!(p.insts[1], Inst::Split { primary: 4, secondary: 2 });
        assert_eq!(p.insts[3], Inst::Jump(1));
    }

    #[test]
    fn test_compile_alternation_targets() {
        let p = compile("a|b|c", RegexFlags::default()).unwrap();
        assert_eq!(p.insts[1], Inst::Split { primary: 2, secondary: 4 });
        assert_eq!(p.insts[3], Inst::Jump(8));
        assert_eq!(p.insts[4], Inst::Split { primary: 5, secondary: 7 });
        assert_eq!(p.insts[6], Inst::Jump(8));
        assert_eq!(p.insts[8], Inst::Save(1));
    }

    #[test]
    fn test_counted_repetition_expands() {
        let p = compile("(a){2,4}", RegexFlags::default()).unwrap();
        let chars = p.insts.iter().filter(|i| matches!(i, Inst::Char { .. })).count();
        assert_eq!(chars, 4);
        assert_eq!(p.group_count(), 1);
    }

    #[test]
    fn test_flags_select_instructions() {
        let flags = RegexFlags::new().multiline(true).dot_all(true).ignore_case(true);
        let p = compile("^.$x", flags).unwrap();
        assert_eq!(p.insts[1], Inst::Assert(Assertion::StartLine));
        assert_eq!(p.insts[2], Inst::Any { newline: true });
        assert_eq!(p.insts[3], Inst::Assert(Assertion::EndLine));
        assert_eq!(p.insts[4], Inst::Char { ch: 'x', fold: true });
        let inline = compile("(?m)^", RegexFlags::default()).unwrap();
        assert_eq!(inline.insts[1], Inst::Assert(Assertion::StartLine));
    }

    #[test]
    fn test_program_length_limit() {
        let err = compile("((a{1000}){1000}){1000}", RegexFlags::default()).unwrap_err();
        match err {
            KernelError::MalformedPattern { reason, .. } => assert!(reason.contains("exceeds")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
