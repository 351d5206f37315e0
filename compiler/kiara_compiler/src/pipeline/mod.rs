//! Phase pipeline: parse → rewrite passes → output.
//!
//! A [`Compiler`] holds an ordered list of phases. The first phase (usually
//! a [`ParserPhase`]) produces a statement and *emits* it, which runs the
//! next phase on it; each phase emits in turn, so a statement flows through
//! the whole chain before the next one is parsed. The shared
//! [`CompilationContext`] carries named values and the index of the running
//! phase between them.

use std::any::Any;
use std::cell::RefCell;

use rustc_hash::FxHashMap;

use kiara_ir::replacer::{self, Replacer};
use kiara_ir::transformer::{self, Transformer};
use kiara_ir::{Node, VisitError};

use crate::PipelineError;

/// Context key of the statement most recently produced by a [`ParserPhase`].
pub const PARSER_RESULT: &str = "parser.result";

/// Named values shared by the phases of one compilation.
///
/// A cleared entry keeps its key but holds no value.
#[derive(Default)]
pub struct CompilationContext {
    values: FxHashMap<String, Option<Box<dyn Any>>>,
    phase: usize,
    end_of_compilation: bool,
}

impl CompilationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// The value stored under `key`, or `default` when there is none or it
    /// has another type.
    pub fn get<T: Any + Clone>(&self, key: &str, default: T) -> T {
        self.get_ref(key).cloned().unwrap_or(default)
    }

    pub fn get_ref<T: Any>(&self, key: &str) -> Option<&T> {
        self.values.get(key)?.as_ref()?.downcast_ref()
    }

    /// Whether `key` holds a value.
    pub fn has(&self, key: &str) -> bool {
        self.values.get(key).is_some_and(Option::is_some)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn set<T: Any>(&mut self, key: &str, value: T) {
        self.values.insert(key.to_owned(), Some(Box::new(value)));
    }

    /// Drop the value under `key`, keeping the key.
    pub fn clear(&mut self, key: &str) {
        if let Some(slot) = self.values.get_mut(key) {
            *slot = None;
        }
    }

    pub fn erase(&mut self, key: &str) {
        self.values.remove(key);
    }

    /// Forget every value and restart at the first phase.
    pub fn clear_all(&mut self) {
        self.values.clear();
        self.phase = 0;
        self.end_of_compilation = false;
    }

    /// Index of the phase the next emit runs.
    pub fn phase(&self) -> usize {
        self.phase
    }

    pub fn end_compilation(&mut self, end: bool) {
        self.end_of_compilation = end;
    }

    pub fn is_end_of_compilation(&self) -> bool {
        self.end_of_compilation
    }
}

/// One step of the pipeline.
pub trait CompilerPhase {
    /// Process `object`, normally finishing with
    /// [`Compiler::emit`] to hand the result to the next phase.
    fn run_phase(
        &mut self,
        compiler: &Compiler<'_>,
        ctx: &mut CompilationContext,
        object: Option<&Node>,
    ) -> Result<(), PipelineError>;

    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Ordered phases run over each statement. Phases may borrow data, such
/// as the type world, for `'a`.
#[derive(Default)]
pub struct Compiler<'a> {
    phases: Vec<RefCell<Box<dyn CompilerPhase + 'a>>>,
}

impl<'a> Compiler<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_phase(&mut self, phase: impl CompilerPhase + 'a) {
        self.phases.push(RefCell::new(Box::new(phase)));
    }

    pub fn remove_all_phases(&mut self) {
        self.phases.clear();
    }

    pub fn num_phases(&self) -> usize {
        self.phases.len()
    }

    /// Run the phase at `ctx.phase()` on `object`.
    ///
    /// The phase index is advanced while the phase runs, so an emit from
    /// inside it reaches the following phase, and restored afterwards.
    /// Past the last phase, or after the end of compilation, this does
    /// nothing.
    pub fn run_phases(
        &self,
        ctx: &mut CompilationContext,
        object: Option<&Node>,
    ) -> Result<(), PipelineError> {
        if ctx.end_of_compilation {
            return Ok(());
        }
        let index = ctx.phase;
        let Some(slot) = self.phases.get(index) else {
            return Ok(());
        };
        let mut phase = slot
            .try_borrow_mut()
            .map_err(|_| PipelineError::Reentrant { phase: index })?;

        let _span = tracing::debug_span!("phase", index, name = phase.name()).entered();
        ctx.phase = index + 1;
        let result = phase.run_phase(self, ctx, object);
        ctx.phase = index;
        if let Err(err) = &result {
            tracing::debug!(%err, "phase failed");
        }
        result
    }

    /// Hand `object` to the next phase.
    pub fn emit(&self, ctx: &mut CompilationContext, object: Option<&Node>) -> Result<(), PipelineError> {
        self.run_phases(ctx, object)
    }

    /// Run the pipeline from the first phase until a phase ends the
    /// compilation. The first phase must eventually do so.
    pub fn run(&self, ctx: &mut CompilationContext) -> Result<(), PipelineError> {
        if self.phases.is_empty() {
            return Ok(());
        }
        ctx.phase = 0;
        while !ctx.end_of_compilation {
            self.run_phases(ctx, None)?;
        }
        Ok(())
    }
}

/// Where a [`ParserPhase`] takes its statements from.
pub trait StatementSource {
    fn at_end(&mut self) -> bool;

    /// The next statement, `None` when nothing more can be parsed.
    fn parse_statement(&mut self) -> Option<Node>;
}

impl<I: Iterator<Item = Node>> StatementSource for std::iter::Peekable<I> {
    fn at_end(&mut self) -> bool {
        self.peek().is_none()
    }

    fn parse_statement(&mut self) -> Option<Node> {
        self.next()
    }
}

/// Produces one statement per run and emits it. Ends the compilation when
/// the source is exhausted.
pub struct ParserPhase<S> {
    source: S,
}

impl<S: StatementSource> ParserPhase<S> {
    pub fn new(source: S) -> Self {
        ParserPhase { source }
    }
}

impl<S: StatementSource> CompilerPhase for ParserPhase<S> {
    fn run_phase(
        &mut self,
        compiler: &Compiler<'_>,
        ctx: &mut CompilationContext,
        _object: Option<&Node>,
    ) -> Result<(), PipelineError> {
        ctx.clear(PARSER_RESULT);
        if self.source.at_end() {
            ctx.end_compilation(true);
            return Ok(());
        }
        let Some(statement) = self.source.parse_statement() else {
            ctx.end_compilation(true);
            return Ok(());
        };
        ctx.set(PARSER_RESULT, statement.clone());
        compiler.emit(ctx, Some(&statement))
    }

    fn name(&self) -> &'static str {
        "parser"
    }
}

/// Rewrites each statement in place with a [`Replacer`], then emits the
/// result, which is a new node only when the statement itself was replaced.
pub struct ReplacePhase<R> {
    replacer: R,
}

impl<R: Replacer> ReplacePhase<R> {
    pub fn new(replacer: R) -> Self {
        ReplacePhase { replacer }
    }

    pub fn replacer(&self) -> &R {
        &self.replacer
    }
}

impl<R: Replacer> CompilerPhase for ReplacePhase<R> {
    fn run_phase(
        &mut self,
        compiler: &Compiler<'_>,
        ctx: &mut CompilationContext,
        object: Option<&Node>,
    ) -> Result<(), PipelineError> {
        let node = object.ok_or(VisitError::NullNode)?;
        self.replacer.reset();
        let result = replacer::apply(&mut self.replacer, node);
        self.replacer.reset();
        compiler.emit(ctx, Some(&result?))
    }
}

/// Rebuilds each statement with a [`Transformer`] and emits the result.
pub struct TransformPhase<T> {
    transformer: T,
}

impl<T: Transformer> TransformPhase<T> {
    pub fn new(transformer: T) -> Self {
        TransformPhase { transformer }
    }
}

impl<T: Transformer> CompilerPhase for TransformPhase<T> {
    fn run_phase(
        &mut self,
        compiler: &Compiler<'_>,
        ctx: &mut CompilationContext,
        object: Option<&Node>,
    ) -> Result<(), PipelineError> {
        let node = object.ok_or(VisitError::NullNode)?;
        self.transformer.clear_result_cache();
        let rebuilt = transformer::apply(&mut self.transformer, node)?;
        compiler.emit(ctx, Some(&rebuilt))
    }
}
