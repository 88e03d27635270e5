use crate::log::LogRecord;
use crate::map::ItemKind;
use crate::program::{BinaryOperator, Expression, Statement, Value, Variable};

use super::{Actor, RuntimeError, StepContext, MAX_CALL_DEPTH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum FrameKind {
    Block,
    /// Body of a `repetir`; `remaining` counts passes still owed after the current one.
    Repeat { remaining: i64 },
    /// Procedure body; owns the innermost scope.
    Call,
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct Frame {
    body: Vec<Statement>,
    pc: usize,
    kind: FrameKind,
}

impl Frame {
    pub(super) fn root(body: Vec<Statement>) -> Self {
        Self::block(body, FrameKind::Block)
    }

    fn block(body: Vec<Statement>, kind: FrameKind) -> Self {
        Self { body, pc: 0, kind }
    }

    fn exhausted(&self) -> bool {
        self.pc >= self.body.len()
    }
}

impl Actor {
    pub(super) fn current_statement(&self) -> Option<Statement> {
        let frame = self.frames.last()?;
        frame.body.get(frame.pc).cloned()
    }

    /// Pops or rewinds exhausted frames until a statement is ready or the stack is empty.
    pub(super) fn unwind(&mut self) {
        while let Some(frame) = self.frames.last_mut() {
            if !frame.exhausted() {
                return;
            }
            let kind = frame.kind;
            match kind {
                FrameKind::Repeat { remaining } if remaining > 0 => {
                    frame.kind = FrameKind::Repeat {
                        remaining: remaining - 1,
                    };
                    frame.pc = 0;
                }
                FrameKind::Call => {
                    self.frames.pop();
                    self.scopes.pop();
                }
                FrameKind::Block | FrameKind::Repeat { .. } => {
                    self.frames.pop();
                }
            }
        }
    }

    fn advance(&mut self) {
        if let Some(frame) = self.frames.last_mut() {
            frame.pc += 1;
        }
    }

    pub(super) fn execute(
        &mut self,
        statement: &Statement,
        ctx: &mut StepContext<'_>,
    ) -> Result<(), RuntimeError> {
        match statement {
            Statement::Move => {
                let (dx, dy) = self.heading.delta();
                self.relocate(self.x.saturating_add(dx), self.y.saturating_add(dy), ctx)?;
                self.advance();
            }
            Statement::TurnRight => {
                self.heading = self.heading.turned_right();
                self.advance();
            }
            Statement::TakeFlower => {
                self.take(ItemKind::Flower, ctx)?;
                self.advance();
            }
            Statement::TakePaper => {
                self.take(ItemKind::Paper, ctx)?;
                self.advance();
            }
            Statement::DropFlower => {
                self.drop_item(ItemKind::Flower, ctx)?;
                self.advance();
            }
            Statement::DropPaper => {
                self.drop_item(ItemKind::Paper, ctx)?;
                self.advance();
            }
            Statement::Position { x, y } => {
                let x = coordinate(self.eval_number(x, ctx)?);
                let y = coordinate(self.eval_number(y, ctx)?);
                self.relocate(x, y, ctx)?;
                self.advance();
            }
            Statement::Report { values } => {
                let mut rendered = Vec::with_capacity(values.len());
                for value in values {
                    rendered.push(self.eval(value, ctx)?.to_string());
                }
                ctx.log.push(LogRecord::info(format!(
                    "{}: {}",
                    self.identifier(),
                    rendered.join(" ")
                )));
                self.advance();
            }
            Statement::Assign { identifier, value } => {
                let value = self.eval(value, ctx)?;
                self.assign(identifier, value)?;
                self.advance();
            }
            Statement::Repeat { times, body } => {
                let times = self.eval_number(times, ctx)?;
                self.advance();
                if times > 0 && !body.is_empty() {
                    self.frames.push(Frame::block(
                        body.clone(),
                        FrameKind::Repeat {
                            remaining: times - 1,
                        },
                    ));
                }
            }
            Statement::While { condition, body } => {
                // The loop statement stays current; popping its body re-evaluates the condition.
                if self.eval_bool(condition, ctx)? {
                    if !body.is_empty() {
                        self.frames.push(Frame::block(body.clone(), FrameKind::Block));
                    }
                } else {
                    self.advance();
                }
            }
            Statement::If {
                condition,
                body,
                else_body,
            } => {
                let branch = if self.eval_bool(condition, ctx)? {
                    body
                } else {
                    else_body
                };
                self.advance();
                if !branch.is_empty() {
                    self.frames.push(Frame::block(branch.clone(), FrameKind::Block));
                }
            }
            Statement::Call {
                identifier,
                arguments,
            } => self.call(identifier, arguments, ctx)?,
            Statement::Unsupported => return Err(RuntimeError::InvalidInstruction),
        }
        Ok(())
    }

    fn call(
        &mut self,
        identifier: &str,
        arguments: &[Expression],
        ctx: &mut StepContext<'_>,
    ) -> Result<(), RuntimeError> {
        let procedure = self
            .descriptor
            .procedures
            .iter()
            .find(|procedure| procedure.identifier == identifier)
            .ok_or_else(|| RuntimeError::UnknownProcedure {
                name: identifier.to_string(),
            })?;
        if procedure.parameters.len() != arguments.len() {
            return Err(RuntimeError::ArgumentCount {
                procedure: identifier.to_string(),
                expected: procedure.parameters.len(),
                found: arguments.len(),
            });
        }
        if self.scopes.len() >= MAX_CALL_DEPTH {
            return Err(RuntimeError::CallDepthExceeded {
                limit: MAX_CALL_DEPTH,
            });
        }

        let mut scope =
            Vec::with_capacity(procedure.parameters.len() + procedure.local_variables.len());
        for (parameter, argument) in procedure.parameters.iter().zip(arguments) {
            let value = self.eval(argument, ctx)?;
            let expected = parameter.initial_value();
            if expected.type_name() != value.type_name() {
                return Err(RuntimeError::TypeMismatch {
                    expected: expected.type_name(),
                    found: value.type_name(),
                });
            }
            scope.push(Variable {
                identifier: parameter.identifier.clone(),
                value,
            });
        }
        scope.extend(procedure.local_variables.iter().map(|local| local.to_variable()));
        let body = procedure.body.clone();

        self.advance();
        self.scopes.push(scope);
        self.frames.push(Frame::block(body, FrameKind::Call));
        Ok(())
    }

    /// Procedures see only their own scope; the robot's variables are visible at top level.
    fn bindings(&self) -> &[Variable] {
        match self.scopes.last() {
            Some(scope) => scope,
            None => &self.variables,
        }
    }

    fn lookup(&self, name: &str) -> Result<Value, RuntimeError> {
        self.bindings()
            .iter()
            .find(|variable| variable.identifier == name)
            .map(|variable| variable.value)
            .ok_or_else(|| RuntimeError::UnknownVariable {
                name: name.to_string(),
            })
    }

    fn assign(&mut self, name: &str, value: Value) -> Result<(), RuntimeError> {
        let bindings = match self.scopes.last_mut() {
            Some(scope) => scope,
            None => &mut self.variables,
        };
        let variable = bindings
            .iter_mut()
            .find(|variable| variable.identifier == name)
            .ok_or_else(|| RuntimeError::UnknownVariable {
                name: name.to_string(),
            })?;
        if variable.value.type_name() != value.type_name() {
            return Err(RuntimeError::TypeMismatch {
                expected: variable.value.type_name(),
                found: value.type_name(),
            });
        }
        variable.value = value;
        Ok(())
    }

    fn relocate(&mut self, x: i32, y: i32, ctx: &StepContext<'_>) -> Result<(), RuntimeError> {
        if !ctx.bounds.contains(x, y) {
            return Err(RuntimeError::OutOfBounds { x, y });
        }
        let areas = &self.descriptor.areas;
        if !areas.is_empty() && !areas.iter().any(|area| area.contains_tile(x, y)) {
            return Err(RuntimeError::OutsideArea { x, y });
        }
        self.x = x;
        self.y = y;
        Ok(())
    }

    fn take(&mut self, kind: ItemKind, ctx: &mut StepContext<'_>) -> Result<(), RuntimeError> {
        if !ctx.items.take_one(kind, self.x, self.y) {
            return Err(RuntimeError::NoItemOnCorner { kind });
        }
        let slot = self.bag_slot(kind);
        *slot = slot.saturating_add(1);
        Ok(())
    }

    fn drop_item(&mut self, kind: ItemKind, ctx: &mut StepContext<'_>) -> Result<(), RuntimeError> {
        let slot = self.bag_slot(kind);
        if *slot == 0 {
            return Err(RuntimeError::EmptyBag { kind });
        }
        *slot -= 1;
        ctx.items.put_one(kind, self.x, self.y);
        Ok(())
    }

    fn bag_slot(&mut self, kind: ItemKind) -> &mut u32 {
        match kind {
            ItemKind::Flower => &mut self.inventory.flower,
            ItemKind::Paper => &mut self.inventory.paper,
        }
    }

    fn eval_number(
        &self,
        expression: &Expression,
        ctx: &StepContext<'_>,
    ) -> Result<i64, RuntimeError> {
        match self.eval(expression, ctx)? {
            Value::Number(value) => Ok(value),
            other => Err(RuntimeError::TypeMismatch {
                expected: "numero",
                found: other.type_name(),
            }),
        }
    }

    fn eval_bool(
        &self,
        expression: &Expression,
        ctx: &StepContext<'_>,
    ) -> Result<bool, RuntimeError> {
        match self.eval(expression, ctx)? {
            Value::Bool(value) => Ok(value),
            other => Err(RuntimeError::TypeMismatch {
                expected: "boolean",
                found: other.type_name(),
            }),
        }
    }

    fn eval(&self, expression: &Expression, ctx: &StepContext<'_>) -> Result<Value, RuntimeError> {
        let value = match expression {
            Expression::Number { value } => Value::Number(*value),
            Expression::Bool { value } => Value::Bool(*value),
            Expression::Variable { identifier } => self.lookup(identifier)?,
            Expression::FlowerOnCorner => {
                Value::Bool(ctx.items.quantity_at(ItemKind::Flower, self.x, self.y) > 0)
            }
            Expression::PaperOnCorner => {
                Value::Bool(ctx.items.quantity_at(ItemKind::Paper, self.x, self.y) > 0)
            }
            Expression::FlowerInBag => Value::Bool(self.inventory.flower > 0),
            Expression::PaperInBag => Value::Bool(self.inventory.paper > 0),
            Expression::Avenue => Value::Number(i64::from(self.x)),
            Expression::Street => Value::Number(i64::from(self.y)),
            Expression::Not { operand } => Value::Bool(!self.eval_bool(operand, ctx)?),
            Expression::Binary {
                operator,
                left,
                right,
            } => {
                let left = self.eval(left, ctx)?;
                let right = self.eval(right, ctx)?;
                apply_binary(*operator, left, right)?
            }
        };
        Ok(value)
    }
}

fn apply_binary(operator: BinaryOperator, left: Value, right: Value) -> Result<Value, RuntimeError> {
    use BinaryOperator as Op;

    match (operator, left, right) {
        (Op::Eq, l, r) if l.type_name() == r.type_name() => Ok(Value::Bool(l == r)),
        (Op::Ne, l, r) if l.type_name() == r.type_name() => Ok(Value::Bool(l != r)),
        (Op::And, Value::Bool(l), Value::Bool(r)) => Ok(Value::Bool(l && r)),
        (Op::Or, Value::Bool(l), Value::Bool(r)) => Ok(Value::Bool(l || r)),
        (Op::And | Op::Or, l, r) => Err(mismatch("boolean", l, r)),
        (_, Value::Number(l), Value::Number(r)) => match operator {
            Op::Add => Ok(Value::Number(l.wrapping_add(r))),
            Op::Sub => Ok(Value::Number(l.wrapping_sub(r))),
            Op::Mul => Ok(Value::Number(l.wrapping_mul(r))),
            Op::Div if r == 0 => Err(RuntimeError::DivisionByZero),
            Op::Div => Ok(Value::Number(l.wrapping_div(r))),
            Op::Lt => Ok(Value::Bool(l < r)),
            Op::Le => Ok(Value::Bool(l <= r)),
            Op::Gt => Ok(Value::Bool(l > r)),
            Op::Ge => Ok(Value::Bool(l >= r)),
            Op::Eq | Op::Ne | Op::And | Op::Or => Err(RuntimeError::InvalidInstruction),
        },
        (_, l, r) => Err(mismatch("numero", l, r)),
    }
}

/// Out-of-range values saturate and then fail the bounds check.
fn coordinate(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

fn mismatch(expected: &'static str, left: Value, right: Value) -> RuntimeError {
    let found = if left.type_name() == expected {
        right.type_name()
    } else {
        left.type_name()
    };
    RuntimeError::TypeMismatch { expected, found }
}
