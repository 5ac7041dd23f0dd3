//! The macro interpreter
//!
//! A playback pass walks a [`Continuation`]'s macros front to back. Passes
//! never recurse into each other for counted loops or timers: the pass returns
//! the next continuation and [`Player::drive`] keeps going until a pass
//! finishes or suspends. Suspended continuations wait in the scheduler until
//! [`Player::tick`] resumes them, or in the render queue until
//! [`Player::render_complete`] moves them to the scheduler.
//!
//! Only conditional and legacy range loops run their body as a nested pass,
//! bounded by `PlayerConfig::max_nesting_depth`.

use std::time::Instant;

use macroplay_core::config::PlayerConfig;
use macroplay_core::{
    ActionLibrary, ActionType, ExecutionMode, HostError, Macro, SurfaceContext,
};
use macroplay_events::{
    EventPayload, LoopStatement, MacroCommand, PlainCommand, SelectObjectEvent, is_event,
};
use tracing::{debug, error, info, warn};

use crate::continuation::{Continuation, LoopFrame};
use crate::error::PlayError;
use crate::host::{Host, Invocation, ScriptUnit};
use crate::render_queue::RenderCompleteQueue;
use crate::resolver;
use crate::scheduler::Scheduler;
use crate::timer::TimerQueue;

/// Operator id of the local action player
const LOCAL_PLAY: &str = "ar.local_play";

const LOCAL_PLAY_RECURSION: &str =
    "Don't run Local Play with default properties, this may cause recursion";

/// How a call into the player ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// Every macro ran
    Finished,
    /// Playback waits for a timer or a render to complete
    Suspended,
}

/// Result of one pass over a continuation
enum Flow {
    Finished,
    Suspended,
    Continue(Continuation),
}

/// What a [`Player::tick`] did
#[derive(Debug, Default)]
pub struct TickReport {
    /// Continuations that ran
    pub resumed: usize,
    /// Continuations dropped because their action was deleted
    pub skipped: usize,
    /// Resumed passes that failed, with their action id
    pub failures: Vec<(String, PlayError)>,
}

pub struct Player {
    config: PlayerConfig,
    scheduler: Box<dyn Scheduler>,
    render_queue: RenderCompleteQueue,
}

impl Default for Player {
    fn default() -> Self {
        Self::new(PlayerConfig::default())
    }
}

impl Player {
    pub fn new(config: PlayerConfig) -> Self {
        Self::with_scheduler(config, Box::new(TimerQueue::<Continuation>::new()))
    }

    pub fn with_scheduler(config: PlayerConfig, scheduler: Box<dyn Scheduler>) -> Self {
        Self {
            config,
            scheduler,
            render_queue: RenderCompleteQueue::new(),
        }
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Continuations waiting for their delay to elapse
    pub fn pending(&self) -> usize {
        self.scheduler.pending()
    }

    /// Actions waiting for a render to complete
    pub fn render_queue(&self) -> &RenderCompleteQueue {
        &self.render_queue
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    /// Nothing is scheduled; render waits may still be queued
    pub fn is_idle(&self) -> bool {
        self.scheduler.pending() == 0
    }

    /// Play an action's active macros from the start
    pub fn play(
        &mut self,
        host: &mut dyn Host,
        library: &mut ActionLibrary,
        action_type: ActionType,
        action_id: &str,
    ) -> Result<PlayOutcome, PlayError> {
        let action = library
            .action(action_type, action_id)
            .ok_or_else(|| PlayError::MissingAction(action_id.to_string()))?;
        info!(target: "playback", "Playing {} ({}, {})", action.label, action.id, action_type);

        let continuation = Continuation::start(action_type, action.id.clone(), &action.macros);
        self.drive(host, library, continuation)
    }

    /// Resume every action waiting for a finished render
    ///
    /// Entries whose action or resume macro no longer exists are skipped.
    /// Returns the number of continuations scheduled.
    pub fn render_complete(&mut self, library: &ActionLibrary) -> usize {
        let mut scheduled = 0;
        for wait in self.render_queue.drain() {
            let Some(action) = library.action(wait.action_type, &wait.action_id) else {
                debug!(target: "playback", "Skipping render resume of deleted action {}", wait.action_id);
                continue;
            };
            let Some(index) = action.find_macro(&wait.resume_macro_id) else {
                debug!(
                    target: "playback",
                    "Skipping render resume of {}: macro {} is gone",
                    wait.action_id,
                    wait.resume_macro_id
                );
                continue;
            };

            let continuation =
                Continuation::start(wait.action_type, action.id.clone(), &action.macros[index..]);
            debug!(
                target: "playback",
                "Resuming {} from macro {} after render",
                action.id,
                wait.resume_macro_id
            );
            self.scheduler
                .register_delayed(continuation, self.config.render_resume_delay());
            scheduled += 1;
        }
        scheduled
    }

    /// Run every continuation due at `now`
    ///
    /// Failures of resumed passes have no caller to return to; they are logged
    /// and reported, and the alert flags are already set.
    pub fn tick(
        &mut self,
        host: &mut dyn Host,
        library: &mut ActionLibrary,
        now: Instant,
    ) -> TickReport {
        let mut report = TickReport::default();
        for continuation in self.scheduler.take_due(now) {
            if library
                .action(continuation.action_type, &continuation.action_id)
                .is_none()
            {
                debug!(target: "playback", "Dropping continuation of deleted action {}", continuation.action_id);
                report.skipped += 1;
                continue;
            }

            report.resumed += 1;
            let action_id = continuation.action_id.clone();
            if let Err(err) = self.drive(host, library, continuation) {
                error!(target: "playback", "Resumed playback of {} failed: {}", action_id, err);
                report.failures.push((action_id, err));
            }
        }
        report
    }

    /// Run passes until one finishes or suspends
    fn drive(
        &mut self,
        host: &mut dyn Host,
        library: &mut ActionLibrary,
        continuation: Continuation,
    ) -> Result<PlayOutcome, PlayError> {
        if continuation.depth > self.config.max_nesting_depth {
            return Err(PlayError::NestingTooDeep(self.config.max_nesting_depth));
        }

        let mut next = continuation;
        loop {
            next = match self.run_pass(host, library, next)? {
                Flow::Finished => return Ok(PlayOutcome::Finished),
                Flow::Suspended => return Ok(PlayOutcome::Suspended),
                Flow::Continue(continuation) => continuation,
            };
        }
    }

    fn run_pass(
        &mut self,
        host: &mut dyn Host,
        library: &mut ActionLibrary,
        mut cont: Continuation,
    ) -> Result<Flow, PlayError> {
        let Some(mode) = library
            .action(cont.action_type, &cont.action_id)
            .map(|action| action.execution_mode)
        else {
            debug!(target: "playback", "Action {} no longer exists", cont.action_id);
            return Ok(Flow::Finished);
        };

        if cont.fresh {
            self.enqueue_render_wait(&cont);
        }

        let base = cont.context.unwrap_or_else(|| host.ambient_context());
        let mut i = 0;
        while i < cont.macros.len() {
            let current = &cont.macros[i];
            let command = current.parse().map_err(|source| {
                fail(
                    library,
                    &cont,
                    current,
                    PlayError::MalformedEvent {
                        command: current.command.clone(),
                        source,
                    },
                )
            })?;
            debug!(target: "playback", "Running {} macro {}", command.kind(), current.id);

            match command {
                MacroCommand::Event(EventPayload::RenderComplete) => {
                    debug!(target: "playback", "Action {} waits for render completion", cont.action_id);
                    return Ok(Flow::Suspended);
                }
                MacroCommand::Event(event @ EventPayload::Timer { .. }) => {
                    let delay = event.timer_delay().unwrap_or_default();
                    let mut resumed =
                        cont.with_macros(cont.macros[i + 1..].to_vec(), cont.loops.clone());
                    resumed.context = Some(base);
                    debug!(
                        target: "playback",
                        "Action {} resumes in {:?} with {} macros",
                        cont.action_id,
                        delay,
                        resumed.macros.len()
                    );
                    self.scheduler.register_delayed(resumed, delay);
                    return Ok(Flow::Suspended);
                }
                MacroCommand::Event(EventPayload::Loop(event)) => {
                    let Some(end) = find_loop_end(&cont.macros, i) else {
                        warn!(target: "playback", "Loop {} has no matching EndLoop, ignoring it", current.id);
                        i += 1;
                        continue;
                    };
                    let statement = event.statement().map_err(|source| {
                        fail(
                            library,
                            &cont,
                            current,
                            PlayError::MalformedEvent {
                                command: current.command.clone(),
                                source,
                            },
                        )
                    })?;
                    let body = cont.macros[i + 1..end].to_vec();

                    match statement {
                        LoopStatement::Condition(expression) => {
                            self.run_condition_loop(host, library, &cont, current, &expression, &body)?;
                        }
                        LoopStatement::Range { start, end, step } => {
                            self.run_range_loop(host, library, &cont, current, (start, end, step), &body)?;
                        }
                        LoopStatement::Repeat(count) if count > 0 => {
                            let mut loops = cont.loops.clone();
                            loops.push(LoopFrame {
                                body: body.clone(),
                                remaining: count,
                                after: cont.macros[end + 1..].to_vec(),
                            });
                            return Ok(Flow::Continue(cont.with_macros(body, loops)));
                        }
                        LoopStatement::Repeat(count) => {
                            debug!(target: "playback", "Skipping loop {} with count {}", current.id, count);
                        }
                    }
                    i = end + 1;
                    continue;
                }
                MacroCommand::Event(EventPayload::EndLoop) => {}
                MacroCommand::Event(EventPayload::SelectObject(event)) => {
                    select_objects(host, &event)
                        .map_err(|err| fail(library, &cont, current, err))?;
                }
                MacroCommand::Event(EventPayload::RunScript { script_text }) => {
                    let unit = ScriptUnit {
                        name: current.id.clone(),
                        source: script_text,
                    };
                    if let Err(err) = host.run_script(&unit) {
                        let message = unit.blame(&err.message);
                        return Err(fail(library, &cont, current, PlayError::Script(message)));
                    }
                }
                MacroCommand::Plain(plain) => {
                    run_plain(host, base, mode, current, plain)
                        .map_err(|err| fail(library, &cont, current, err))?;
                }
            }
            i += 1;
        }

        // End of the pass: restart the innermost counted loop or leave it
        let Some(frame) = cont.loops.pop() else {
            return Ok(Flow::Finished);
        };
        let mut loops = std::mem::take(&mut cont.loops);
        if frame.remaining > 1 {
            let body = frame.body.clone();
            loops.push(LoopFrame {
                remaining: frame.remaining - 1,
                ..frame
            });
            Ok(Flow::Continue(cont.with_macros(body, loops)))
        } else {
            Ok(Flow::Continue(cont.with_macros(frame.after, loops)))
        }
    }

    /// Queue the first render wait of a fresh pass for resumption
    fn enqueue_render_wait(&mut self, cont: &Continuation) {
        let Some(index) = cont.macros.iter().position(|m| {
            is_event(&m.command)
                && matches!(m.parse(), Ok(MacroCommand::Event(EventPayload::RenderComplete)))
        }) else {
            return;
        };

        match cont.macros.get(index + 1) {
            Some(next) => {
                debug!(target: "playback", "Action {} resumes at {} after render", cont.action_id, next.id);
                self.render_queue
                    .enqueue(cont.action_type, cont.action_id.clone(), next.id.clone());
            }
            None => {
                debug!(target: "playback", "Render wait ends action {}, nothing to resume", cont.action_id);
            }
        }
    }

    fn run_condition_loop(
        &mut self,
        host: &mut dyn Host,
        library: &mut ActionLibrary,
        cont: &Continuation,
        loop_macro: &Macro,
        statement: &str,
        body: &[Macro],
    ) -> Result<(), PlayError> {
        loop {
            match host.evaluate(statement) {
                Ok(true) => {}
                Ok(false) => return Ok(()),
                Err(source) => {
                    let err = PlayError::Condition {
                        statement: statement.to_string(),
                        source,
                    };
                    return Err(fail(library, cont, loop_macro, err));
                }
            }
            self.drive_body(host, library, cont, loop_macro, body)?;
        }
    }

    fn run_range_loop(
        &mut self,
        host: &mut dyn Host,
        library: &mut ActionLibrary,
        cont: &Continuation,
        loop_macro: &Macro,
        (start, end, step): (f64, f64, f64),
        body: &[Macro],
    ) -> Result<(), PlayError> {
        if step == 0.0 || !(start.is_finite() && end.is_finite() && step.is_finite()) {
            let err = PlayError::InvalidLoopRange { start, end, step };
            return Err(fail(library, cont, loop_macro, err));
        }

        let count = ((end - start) / step).ceil().max(0.0) as u64;
        for _ in 0..count {
            self.drive_body(host, library, cont, loop_macro, body)?;
        }
        Ok(())
    }

    /// Play a loop body as a self-contained nested pass
    ///
    /// Failures inside the body are already flagged on their own macro; the
    /// loop macro is only flagged when the body would nest too deep.
    fn drive_body(
        &mut self,
        host: &mut dyn Host,
        library: &mut ActionLibrary,
        cont: &Continuation,
        loop_macro: &Macro,
        body: &[Macro],
    ) -> Result<(), PlayError> {
        let nested = cont.nested(body.to_vec());
        if nested.depth > self.config.max_nesting_depth {
            let err = PlayError::NestingTooDeep(self.config.max_nesting_depth);
            return Err(fail(library, cont, loop_macro, err));
        }
        self.drive(host, library, nested).map(|_| ())
    }
}

/// Log a pass failure and flag the action and the macro that caused it
fn fail(
    library: &mut ActionLibrary,
    cont: &Continuation,
    culprit: &Macro,
    err: PlayError,
) -> PlayError {
    match &err {
        PlayError::Invocation { .. } => error!(target: "playback", "{}", err),
        _ => error!(target: "playback", "{}; command: {}", err, culprit.command),
    }
    library.mark_alert(cont.action_type, &cont.action_id, &culprit.id);
    err
}

/// Index of the `EndLoop` closing the loop opened at `start`
fn find_loop_end(macros: &[Macro], start: usize) -> Option<usize> {
    let mut depth = 1usize;
    for (index, m) in macros.iter().enumerate().skip(start + 1) {
        if !is_event(&m.command) {
            continue;
        }
        match m.parse() {
            Ok(MacroCommand::Event(EventPayload::Loop(_))) => depth += 1,
            Ok(MacroCommand::Event(EventPayload::EndLoop)) => {
                depth -= 1;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

fn select_objects(host: &mut dyn Host, event: &SelectObjectEvent) -> Result<(), PlayError> {
    if !event.keep_selection {
        host.deselect_all();
    }

    for name in &event.objects {
        if host.object_exists(name) {
            host.select_object(name, true);
        }
    }

    if let Some(primary) = event.primary() {
        if !host.object_in_view_layer(primary) {
            return Err(PlayError::MissingObject(primary.to_string()));
        }
        host.set_active_object(Some(primary));
        host.select_object(primary, true);
    }
    Ok(())
}

fn run_plain(
    host: &mut dyn Host,
    base: SurfaceContext,
    mode: ExecutionMode,
    current: &Macro,
    command: PlainCommand,
) -> Result<(), PlayError> {
    if let PlainCommand::Operator(call) = &command {
        if call.id() == LOCAL_PLAY && call.has_exactly_args(&[("id", "\"\""), ("index", "-1")]) {
            return Err(PlayError::RecursionGuard(LOCAL_PLAY_RECURSION.to_string()));
        }
    }

    let invocation = Invocation {
        command,
        operator_context: current.operator_execution_context,
        raw: current.command.trim().to_string(),
    };

    let resolved = resolver::resolve(host.surfaces_mut(), base, current.required_ui_type());
    let result = match mode {
        ExecutionMode::Group => host.invoke(&invocation, &resolved.context),
        ExecutionMode::Individual => invoke_individually(host, &invocation, &resolved.context),
    };
    resolver::restore(host.surfaces_mut(), &resolved);

    match result {
        Ok(()) => {
            if let Some(area) = resolved.context.area {
                host.tag_redraw(area);
            }
            Ok(())
        }
        Err(source) => Err(PlayError::Invocation {
            command: invocation.raw,
            source,
        }),
    }
}

/// Invoke once per selected object, each time with only that object selected and active
///
/// The original selection and active object are restored even when an
/// invocation fails; the first failure stops the iteration.
fn invoke_individually(
    host: &mut dyn Host,
    invocation: &Invocation,
    context: &SurfaceContext,
) -> Result<(), HostError> {
    let selected = host.selected_objects();
    let active = host.active_object();
    for name in &selected {
        host.select_object(name, false);
    }

    let mut result = Ok(());
    for name in &selected {
        host.select_object(name, true);
        host.set_active_object(Some(name.as_str()));
        result = host.invoke(invocation, context);
        host.select_object(name, false);
        if result.is_err() {
            break;
        }
    }

    for name in &selected {
        host.select_object(name, true);
    }
    let active = active.filter(|name| host.object_exists(name));
    host.set_active_object(active.as_deref());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use macroplay_events::LoopEvent;

    fn event(payload: EventPayload) -> Macro {
        Macro::new(payload.to_command())
    }

    #[test]
    fn test_find_loop_end_respects_nesting() {
        let macros = vec![
            event(EventPayload::Loop(LoopEvent::repeat(2))),
            event(EventPayload::Loop(LoopEvent::repeat(2))),
            Macro::new("bpy.ops.a.b()"),
            event(EventPayload::EndLoop),
            event(EventPayload::EndLoop),
            Macro::new("bpy.ops.a.c()"),
        ];
        assert_eq!(find_loop_end(&macros, 0), Some(4));
        assert_eq!(find_loop_end(&macros, 1), Some(3));
    }

    #[test]
    fn test_find_loop_end_unmatched() {
        let macros = vec![
            event(EventPayload::Loop(LoopEvent::repeat(2))),
            Macro::new("bpy.ops.a.b()"),
        ];
        assert_eq!(find_loop_end(&macros, 0), None);
    }
}
