#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutKind {
	/// No "OK" after the command. Hard failure.
	Ready,
	/// No "Done" after the last chunk. Upload still counts as sent.
	Completion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
	Idle,
	AwaitingReady,
	Transferring,
	AwaitingCompletion,
	Done,
	TimedOut(TimeoutKind),
}
