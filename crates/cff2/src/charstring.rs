//! CFF2 charstring interpretation.
//!
//! A single pass over a glyph's bytecode produces the default-instance
//! outline together with every blend group the bytecode captured. The
//! operator stream is recorded so the outline at any other design location
//! can be replayed with [`DecodedCharString::outline_at`] without parsing
//! the bytecode again.
//!
//! See <https://learn.microsoft.com/en-us/typography/opentype/spec/cff2charstr>

use std::ops::Range;

use kurbo::{BezPath, Point};

use crate::{
    blend::CapturedBlend,
    config::NESTING_DEPTH_LIMIT,
    error::{FormatError, InterpretationError, Result},
    index::Index,
    number::{ESCAPE, parse_fixed, parse_short_int},
    parse::Cursor,
    stack::Stack,
};

/// Charstring operator.
///
/// See <https://learn.microsoft.com/en-us/typography/opentype/spec/cff2charstr#appendix-a-cff2-charstring-command-codes>
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Operator {
    HStem,
    VStem,
    VMoveTo,
    RLineTo,
    HLineTo,
    VLineTo,
    RrCurveTo,
    CallSubr,
    Return,
    EndChar,
    VariationStoreIndex,
    Blend,
    HStemHm,
    HintMask,
    CntrMask,
    RMoveTo,
    HMoveTo,
    VStemHm,
    RCurveLine,
    RLineCurve,
    VvCurveTo,
    HhCurveTo,
    CallGsubr,
    VhCurveTo,
    HvCurveTo,
    HFlex,
    Flex,
    HFlex1,
    Flex1,
    /// Reserved one byte operator.
    Unknown(u8),
    /// Reserved two byte operator (the byte following the escape).
    UnknownEscape(u8),
}

impl Operator {
    fn read(cursor: &mut Cursor, b0: u8) -> std::result::Result<Self, FormatError> {
        if b0 == ESCAPE {
            let b1 = cursor.read_u8()?;
            Ok(Self::from_two_byte_opcode(b1))
        } else {
            Ok(Self::from_opcode(b0))
        }
    }

    pub fn from_opcode(opcode: u8) -> Self {
        use Operator::*;
        match opcode {
            1 => HStem,
            3 => VStem,
            4 => VMoveTo,
            5 => RLineTo,
            6 => HLineTo,
            7 => VLineTo,
            8 => RrCurveTo,
            10 => CallSubr,
            11 => Return,
            14 => EndChar,
            15 => VariationStoreIndex,
            16 => Blend,
            18 => HStemHm,
            19 => HintMask,
            20 => CntrMask,
            21 => RMoveTo,
            22 => HMoveTo,
            23 => VStemHm,
            24 => RCurveLine,
            25 => RLineCurve,
            26 => VvCurveTo,
            27 => HhCurveTo,
            29 => CallGsubr,
            30 => VhCurveTo,
            31 => HvCurveTo,
            _ => Unknown(opcode),
        }
    }

    /// Operator from the byte following an escape (12).
    pub fn from_two_byte_opcode(opcode: u8) -> Self {
        use Operator::*;
        match opcode {
            34 => HFlex,
            35 => Flex,
            36 => HFlex1,
            37 => Flex1,
            _ => UnknownEscape(opcode),
        }
    }

    /// Appends the operator's encoding.
    pub fn encode(self, out: &mut Vec<u8>) {
        use Operator::*;
        let byte = match self {
            HStem => 1,
            VStem => 3,
            VMoveTo => 4,
            RLineTo => 5,
            HLineTo => 6,
            VLineTo => 7,
            RrCurveTo => 8,
            CallSubr => 10,
            Return => 11,
            EndChar => 14,
            VariationStoreIndex => 15,
            Blend => 16,
            HStemHm => 18,
            HintMask => 19,
            CntrMask => 20,
            RMoveTo => 21,
            HMoveTo => 22,
            VStemHm => 23,
            RCurveLine => 24,
            RLineCurve => 25,
            VvCurveTo => 26,
            HhCurveTo => 27,
            CallGsubr => 29,
            VhCurveTo => 30,
            HvCurveTo => 31,
            Unknown(b) => b,
            HFlex => return out.extend_from_slice(&[ESCAPE, 34]),
            Flex => return out.extend_from_slice(&[ESCAPE, 35]),
            HFlex1 => return out.extend_from_slice(&[ESCAPE, 36]),
            Flex1 => return out.extend_from_slice(&[ESCAPE, 37]),
            UnknownEscape(b) => return out.extend_from_slice(&[ESCAPE, b]),
        };
        out.push(byte);
    }

    /// Stem and mask operators.
    pub fn is_hint(self) -> bool {
        use Operator::*;
        matches!(self, HStem | VStem | HStemHm | VStemHm | HintMask | CntrMask)
    }

    /// Operators that move the current point.
    pub fn is_path(self) -> bool {
        use Operator::*;
        matches!(
            self,
            RMoveTo
                | HMoveTo
                | VMoveTo
                | RLineTo
                | HLineTo
                | VLineTo
                | RrCurveTo
                | RCurveLine
                | RLineCurve
                | VvCurveTo
                | HhCurveTo
                | VhCurveTo
                | HvCurveTo
                | HFlex
                | Flex
                | HFlex1
                | Flex1
        )
    }
}

/// An absolute outline command. Contours are not explicitly closed.
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum PathCommand {
    MoveTo(Point),
    LineTo(Point),
    CurveTo(Point, Point, Point),
}

/// An operator that consumed the operand stack, with the slice of the
/// flattened operand stream it consumed.
#[derive(Clone, PartialEq, Debug)]
pub struct TraceOp {
    pub operator: Operator,
    pub operands: Range<usize>,
    /// The first operand is the advance width rather than an argument.
    pub has_width: bool,
}

impl TraceOp {
    /// The operator's arguments, excluding any width operand.
    pub fn arguments(&self) -> Range<usize> {
        self.operands.start + self.has_width as usize..self.operands.end
    }
}

/// One top-level operator and the bytes that make it up: its operands,
/// any blend runs feeding them, and mask bytes for hint masks.
#[derive(Clone, PartialEq, Debug)]
pub struct Token {
    pub operator: Operator,
    pub range: Range<usize>,
}

/// Subroutines and variation parameters a charstring is interpreted with.
#[derive(Clone, Copy, Debug)]
pub struct CharStringContext<'a> {
    pub global_subrs: Index<'a>,
    pub local_subrs: Option<Index<'a>>,
    /// Number of deltas in each blend group.
    pub axis_count: usize,
    /// Data block used when the charstring has no `vsindex` operator.
    pub default_store_index: u16,
    pub nesting_limit: u32,
}

impl<'a> CharStringContext<'a> {
    pub fn new(global_subrs: Index<'a>, local_subrs: Option<Index<'a>>, axis_count: usize) -> Self {
        Self {
            global_subrs,
            local_subrs,
            axis_count,
            default_store_index: 0,
            nesting_limit: NESTING_DEPTH_LIMIT,
        }
    }

    pub fn default_store_index(mut self, store_index: u16) -> Self {
        self.default_store_index = store_index;
        self
    }

    pub fn nesting_limit(mut self, limit: u32) -> Self {
        self.nesting_limit = limit;
        self
    }
}

/// The result of interpreting one glyph.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct DecodedCharString {
    /// Outline at the default location.
    pub path: Vec<PathCommand>,
    /// Blend groups in capture order.
    pub blend_groups: Vec<CapturedBlend>,
    pub advance_width: Option<f64>,
    pub stem_hint_count: u32,
    /// Item variation data block the blend groups refer to.
    pub store_index: u16,
    ops: Vec<TraceOp>,
    operands: Vec<f64>,
    operand_blends: Vec<Option<usize>>,
    tokens: Vec<Token>,
    width_token: Option<usize>,
    hints_in_subroutine: bool,
}

impl DecodedCharString {
    /// Stack-consuming operators in execution order, subroutines inlined.
    pub fn ops(&self) -> &[TraceOp] {
        &self.ops
    }

    /// Flattened operand stream, blended slots holding their base.
    pub fn operands(&self) -> &[f64] {
        &self.operands
    }

    /// Top-level operators of the charstring in byte order.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Index of the top-level token that carried the advance width.
    pub fn width_token(&self) -> Option<usize> {
        self.width_token
    }

    /// Whether a stem or mask operator was executed inside a subroutine.
    pub fn hints_in_subroutine(&self) -> bool {
        self.hints_in_subroutine
    }

    /// Replays the outline with every blended operand resolved against
    /// `scalars` (one per delta, see [`block_scalars`](crate::scalar::block_scalars)).
    ///
    /// Resolution is positional, so a data block with more regions than
    /// the font has axes only has its leading regions applied.
    pub fn outline_at(&self, scalars: &[f64]) -> Vec<PathCommand> {
        let resolved: Vec<f64> = self
            .operands
            .iter()
            .zip(&self.operand_blends)
            .map(|(&value, blend)| {
                blend
                    .and_then(|ix| self.blend_groups.get(ix))
                    .map_or(value, |captured| captured.group.resolve(scalars))
            })
            .collect();
        let mut outline = Outline::default();
        for op in self.ops.iter().filter(|op| op.operator.is_path()) {
            let Some(args) = resolved.get(op.arguments()) else {
                break;
            };
            if outline.apply(op.operator, args, 0).is_err() {
                break;
            }
        }
        outline.commands
    }

    /// Converts the default outline to a [`BezPath`], closing each contour.
    pub fn to_bez_path(&self) -> BezPath {
        to_bez_path(&self.path)
    }
}

/// Converts outline commands to a [`BezPath`], closing each contour.
pub fn to_bez_path(commands: &[PathCommand]) -> BezPath {
    let mut path = BezPath::new();
    let mut open = false;
    for command in commands {
        match *command {
            PathCommand::MoveTo(p) => {
                if open {
                    path.close_path();
                }
                path.move_to(p);
                open = true;
            }
            PathCommand::LineTo(p) => path.line_to(p),
            PathCommand::CurveTo(c0, c1, p) => path.curve_to(c0, c1, p),
        }
    }
    if open {
        path.close_path();
    }
    path
}

/// Interprets a glyph's charstring.
pub fn interpret(bytes: &[u8], ctx: &CharStringContext) -> Result<DecodedCharString> {
    let mut interpreter = Interpreter::new(ctx);
    interpreter.evaluate(bytes, 0)?;
    Ok(interpreter.finish())
}

/// Maps cursor truncation to the recoverable per-glyph error.
fn truncated(err: FormatError) -> InterpretationError {
    match err {
        FormatError::UnexpectedEnd { offset } => InterpretationError::Truncated { offset },
        _ => InterpretationError::Truncated { offset: 0 },
    }
}

/// Current point and emitted commands.
#[derive(Default)]
struct Outline {
    x: f64,
    y: f64,
    commands: Vec<PathCommand>,
}

fn arg(args: &[f64], i: usize, offset: usize) -> std::result::Result<f64, InterpretationError> {
    args.get(i).copied().ok_or(InterpretationError::StackUnderflow { offset })
}

fn arg_array<const N: usize>(
    args: &[f64],
    i: usize,
    offset: usize,
) -> std::result::Result<[f64; N], InterpretationError> {
    let slice = args.get(i..i + N).ok_or(InterpretationError::StackUnderflow { offset })?;
    let mut out = [0.0; N];
    out.copy_from_slice(slice);
    Ok(out)
}

impl Outline {
    fn move_to(&mut self) {
        self.commands.push(PathCommand::MoveTo(Point::new(self.x, self.y)));
    }

    fn line_to(&mut self) {
        self.commands.push(PathCommand::LineTo(Point::new(self.x, self.y)));
    }

    /// Curve ending at the current point.
    fn curve_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) {
        self.commands.push(PathCommand::CurveTo(
            Point::new(x1, y1),
            Point::new(x2, y2),
            Point::new(self.x, self.y),
        ));
    }

    /// Runs a path construction operator over its arguments.
    ///
    /// Flex operators always emit their two curves.
    fn apply(
        &mut self,
        operator: Operator,
        args: &[f64],
        offset: usize,
    ) -> std::result::Result<(), InterpretationError> {
        use Operator::*;
        let count = args.len();
        match operator {
            RMoveTo => {
                let [dx, dy] = arg_array::<2>(args, 0, offset)?;
                self.x += dx;
                self.y += dy;
                self.move_to();
            }
            HMoveTo => {
                self.x += arg(args, 0, offset)?;
                self.move_to();
            }
            VMoveTo => {
                self.y += arg(args, 0, offset)?;
                self.move_to();
            }
            RLineTo => {
                let mut i = 0;
                while i < count {
                    let [dx, dy] = arg_array::<2>(args, i, offset)?;
                    self.x += dx;
                    self.y += dy;
                    self.line_to();
                    i += 2;
                }
            }
            HLineTo | VLineTo => {
                let mut is_x = operator == HLineTo;
                for &value in args {
                    if is_x {
                        self.x += value;
                    } else {
                        self.y += value;
                    }
                    is_x = !is_x;
                    self.line_to();
                }
            }
            RrCurveTo | RCurveLine => {
                let mut i = 0;
                while i + 6 <= count && (operator == RrCurveTo || i + 8 <= count) {
                    let a = arg_array::<6>(args, i, offset)?;
                    let x1 = self.x + a[0];
                    let y1 = self.y + a[1];
                    let x2 = x1 + a[2];
                    let y2 = y1 + a[3];
                    self.x = x2 + a[4];
                    self.y = y2 + a[5];
                    self.curve_to(x1, y1, x2, y2);
                    i += 6;
                }
                if operator == RCurveLine {
                    let [dx, dy] = arg_array::<2>(args, i, offset)?;
                    self.x += dx;
                    self.y += dy;
                    self.line_to();
                }
            }
            RLineCurve => {
                let mut i = 0;
                while i + 6 < count {
                    let [dx, dy] = arg_array::<2>(args, i, offset)?;
                    self.x += dx;
                    self.y += dy;
                    self.line_to();
                    i += 2;
                }
                let a = arg_array::<6>(args, i, offset)?;
                let x1 = self.x + a[0];
                let y1 = self.y + a[1];
                let x2 = x1 + a[2];
                let y2 = y1 + a[3];
                self.x = x2 + a[4];
                self.y = y2 + a[5];
                self.curve_to(x1, y1, x2, y2);
            }
            VvCurveTo => {
                let mut i = 0;
                if count & 1 != 0 {
                    self.x += arg(args, 0, offset)?;
                    i = 1;
                }
                while i < count {
                    let a = arg_array::<4>(args, i, offset)?;
                    let x1 = self.x;
                    let y1 = self.y + a[0];
                    let x2 = x1 + a[1];
                    let y2 = y1 + a[2];
                    self.x = x2;
                    self.y = y2 + a[3];
                    self.curve_to(x1, y1, x2, y2);
                    i += 4;
                }
            }
            HhCurveTo => {
                let mut i = 0;
                if count & 1 != 0 {
                    self.y += arg(args, 0, offset)?;
                    i = 1;
                }
                while i < count {
                    let a = arg_array::<4>(args, i, offset)?;
                    let x1 = self.x + a[0];
                    let y1 = self.y;
                    let x2 = x1 + a[1];
                    let y2 = y1 + a[2];
                    self.x = x2 + a[3];
                    self.y = y2;
                    self.curve_to(x1, y1, x2, y2);
                    i += 4;
                }
            }
            HvCurveTo | VhCurveTo => {
                let mut i = 0;
                let mut horizontal = operator == HvCurveTo;
                while i < count {
                    let a = arg_array::<4>(args, i, offset)?;
                    // a trailing fifth operand applies to the final curve
                    let last = if count - i == 5 { arg(args, i + 4, offset)? } else { 0.0 };
                    let (x1, y1, x2, y2);
                    if horizontal {
                        x1 = self.x + a[0];
                        y1 = self.y;
                        x2 = x1 + a[1];
                        y2 = y1 + a[2];
                        self.x = x2 + last;
                        self.y = y2 + a[3];
                    } else {
                        x1 = self.x;
                        y1 = self.y + a[0];
                        x2 = x1 + a[1];
                        y2 = y1 + a[2];
                        self.x = x2 + a[3];
                        self.y = y2 + last;
                    }
                    self.curve_to(x1, y1, x2, y2);
                    horizontal = !horizontal;
                    i += if count - i == 5 { 5 } else { 4 };
                }
            }
            Flex => {
                let a = arg_array::<12>(args, 0, offset)?;
                let x1 = self.x + a[0];
                let y1 = self.y + a[1];
                let x2 = x1 + a[2];
                let y2 = y1 + a[3];
                let x3 = x2 + a[4];
                let y3 = y2 + a[5];
                let x4 = x3 + a[6];
                let y4 = y3 + a[7];
                let x5 = x4 + a[8];
                let y5 = y4 + a[9];
                self.x = x3;
                self.y = y3;
                self.curve_to(x1, y1, x2, y2);
                self.x = x5 + a[10];
                self.y = y5 + a[11];
                self.curve_to(x4, y4, x5, y5);
            }
            HFlex => {
                let a = arg_array::<7>(args, 0, offset)?;
                let start_y = self.y;
                let x1 = self.x + a[0];
                let y1 = self.y;
                let x2 = x1 + a[1];
                let y2 = y1 + a[2];
                let x3 = x2 + a[3];
                let x4 = x3 + a[4];
                let x5 = x4 + a[5];
                self.x = x3;
                self.y = y2;
                self.curve_to(x1, y1, x2, y2);
                self.x = x5 + a[6];
                self.y = start_y;
                self.curve_to(x4, y2, x5, start_y);
            }
            HFlex1 => {
                let a = arg_array::<9>(args, 0, offset)?;
                let start_y = self.y;
                let x1 = self.x + a[0];
                let y1 = self.y + a[1];
                let x2 = x1 + a[2];
                let y2 = y1 + a[3];
                let x3 = x2 + a[4];
                let x4 = x3 + a[5];
                let x5 = x4 + a[6];
                let y5 = y2 + a[7];
                self.x = x3;
                self.y = y2;
                self.curve_to(x1, y1, x2, y2);
                self.x = x5 + a[8];
                self.y = start_y;
                self.curve_to(x4, y2, x5, y5);
            }
            Flex1 => {
                let a = arg_array::<11>(args, 0, offset)?;
                let (start_x, start_y) = (self.x, self.y);
                let x1 = self.x + a[0];
                let y1 = self.y + a[1];
                let x2 = x1 + a[2];
                let y2 = y1 + a[3];
                let x3 = x2 + a[4];
                let y3 = y2 + a[5];
                let x4 = x3 + a[6];
                let y4 = y3 + a[7];
                let x5 = x4 + a[8];
                let y5 = y4 + a[9];
                self.x = x3;
                self.y = y3;
                self.curve_to(x1, y1, x2, y2);
                if (x5 - start_x).abs() > (y5 - start_y).abs() {
                    self.x = x5 + a[10];
                    self.y = start_y;
                } else {
                    self.x = start_x;
                    self.y = y5 + a[10];
                }
                self.curve_to(x4, y4, x5, y5);
            }
            _ => {}
        }
        Ok(())
    }
}

/// Transient state for one glyph, shared across subroutine calls.
struct Interpreter<'c, 'a> {
    ctx: &'c CharStringContext<'a>,
    stack: Stack,
    outline: Outline,
    stem_count: u32,
    width_checked: bool,
    advance_width: Option<f64>,
    store_index: u16,
    captured: Vec<CapturedBlend>,
    ops: Vec<TraceOp>,
    operands: Vec<f64>,
    operand_blends: Vec<Option<usize>>,
    tokens: Vec<Token>,
    segment_start: usize,
    width_token: Option<usize>,
    hints_in_subroutine: bool,
    finished: bool,
}

impl<'c, 'a> Interpreter<'c, 'a> {
    fn new(ctx: &'c CharStringContext<'a>) -> Self {
        Self {
            ctx,
            stack: Stack::new(),
            outline: Outline::default(),
            stem_count: 0,
            width_checked: false,
            advance_width: None,
            store_index: ctx.default_store_index,
            captured: Vec::new(),
            ops: Vec::new(),
            operands: Vec::new(),
            operand_blends: Vec::new(),
            tokens: Vec::new(),
            segment_start: 0,
            width_token: None,
            hints_in_subroutine: false,
            finished: false,
        }
    }

    fn finish(self) -> DecodedCharString {
        DecodedCharString {
            path: self.outline.commands,
            blend_groups: self.captured,
            advance_width: self.advance_width,
            stem_hint_count: self.stem_count,
            store_index: self.store_index,
            ops: self.ops,
            operands: self.operands,
            operand_blends: self.operand_blends,
            tokens: self.tokens,
            width_token: self.width_token,
            hints_in_subroutine: self.hints_in_subroutine,
        }
    }

    fn evaluate(&mut self, bytes: &[u8], depth: u32) -> Result<()> {
        if depth > self.ctx.nesting_limit {
            return Err(InterpretationError::NestingDepthExceeded { limit: self.ctx.nesting_limit }.into());
        }
        let mut cursor = Cursor::new(bytes);
        while !cursor.is_empty() && !self.finished {
            let start = cursor.position();
            let b0 = cursor.read_u8().map_err(truncated)?;
            match b0 {
                28 | 32..=254 => {
                    let value = parse_short_int(&mut cursor, b0).map_err(truncated)?;
                    self.stack.push(value as f64, start)?;
                }
                255 => {
                    let value = parse_fixed(&mut cursor).map_err(truncated)?;
                    self.stack.push(value, start)?;
                }
                _ => {
                    let operator = Operator::read(&mut cursor, b0).map_err(truncated)?;
                    self.evaluate_operator(operator, &mut cursor, start, depth)?;
                    if depth == 0 && operator != Operator::Blend {
                        self.tokens.push(Token {
                            operator,
                            range: self.segment_start..cursor.position(),
                        });
                        self.segment_start = cursor.position();
                    }
                    if operator == Operator::Return {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    /// Decides whether the first operand of the current stack is an
    /// advance width. Only the first stack-clearing hint or move operator
    /// may carry one.
    fn take_width(&mut self, operator: Operator) -> bool {
        use Operator::*;
        if self.width_checked {
            return false;
        }
        let len = self.stack.len();
        let has_width = match operator {
            HStem | VStem | HStemHm | VStemHm | HintMask | CntrMask => self.stack.len_is_odd(),
            RMoveTo => len > 2,
            HMoveTo | VMoveTo => len > 1,
            EndChar => len > 0,
            _ => return false,
        };
        self.width_checked = true;
        has_width
    }

    /// Moves the stack into the operand stream and records the operator.
    /// Returns the range of its arguments.
    fn consume(&mut self, operator: Operator, depth: u32) -> Range<usize> {
        let has_width = self.take_width(operator);
        let start = self.operands.len();
        self.stack.drain_into(&mut self.operands, &mut self.operand_blends);
        if has_width {
            self.advance_width = self.operands.get(start).copied();
            if depth == 0 {
                self.width_token = Some(self.tokens.len());
            }
        }
        let op = TraceOp { operator, operands: start..self.operands.len(), has_width };
        let args = op.arguments();
        self.ops.push(op);
        args
    }

    fn evaluate_operator(
        &mut self,
        operator: Operator,
        cursor: &mut Cursor,
        offset: usize,
        depth: u32,
    ) -> Result<()> {
        use Operator::*;
        match operator {
            Blend => {
                let consumed = self.operands.len();
                self.stack.apply_blend(self.ctx.axis_count, offset, &mut self.captured, consumed)?;
            }
            VariationStoreIndex => {
                let index = self.stack.pop(offset)?;
                if index.fract() != 0.0 || !(0.0..=u16::MAX as f64).contains(&index) {
                    return Err(FormatError::InvalidStoreIndex { offset }.into());
                }
                self.store_index = index as u16;
            }
            CallSubr | CallGsubr => {
                let subrs = if operator == CallSubr {
                    self.ctx.local_subrs.ok_or(FormatError::MissingSubroutines)?
                } else {
                    self.ctx.global_subrs
                };
                let index = self.stack.pop(offset)? as i32 + subrs.subr_bias();
                let body = usize::try_from(index)
                    .ok()
                    .and_then(|ix| subrs.get(ix))
                    .ok_or(FormatError::SubroutineOutOfRange { index, count: subrs.len() })?;
                self.evaluate(body, depth + 1)?;
            }
            Return => {}
            EndChar => {
                self.consume(operator, depth);
                self.finished = true;
            }
            HStem | VStem | HStemHm | VStemHm => {
                let args = self.consume(operator, depth);
                self.stem_count += (args.len() / 2) as u32;
                self.hints_in_subroutine |= depth > 0;
            }
            HintMask | CntrMask => {
                // operands before a mask are implied vstemhm pairs
                let args = self.consume(operator, depth);
                self.stem_count += (args.len() / 2) as u32;
                self.hints_in_subroutine |= depth > 0;
                let mask_len = self.stem_count.div_ceil(8) as usize;
                cursor.skip(mask_len).map_err(truncated)?;
            }
            Unknown(_) | UnknownEscape(_) => {
                self.consume(operator, depth);
            }
            _ => {
                let args = self.consume(operator, depth);
                self.outline.apply(operator, &self.operands[args], offset)?;
            }
        }
        Ok(())
    }
}
