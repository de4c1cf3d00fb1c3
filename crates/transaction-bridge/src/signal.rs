use shelf_job_system::Error;

use std::fmt;

const FINISHED: &str = "Finished";
const PERCENT_PROGRESS: &str = "PercentProgress";

/// A single argument of a remote signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalArg {
	Bool(bool),
	Str(String),
	U32(u32),
}

impl fmt::Display for SignalArg {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Bool(_) => f.write_str("b"),
			Self::Str(_) => f.write_str("s"),
			Self::U32(_) => f.write_str("u"),
		}
	}
}

/// A signal as received from a remote transaction endpoint, not yet interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
	pub member: String,
	pub args: Vec<SignalArg>,
}

/// What a [`Signal`] means for the transaction being waited on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
	Finished { success: bool, message: String },
	PercentProgress { text: String, percentage: u32 },
	Other(String),
}

impl Signal {
	pub fn new(member: impl Into<String>, args: Vec<SignalArg>) -> Self {
		Self {
			member: member.into(),
			args,
		}
	}

	pub fn finished(success: bool, message: impl Into<String>) -> Self {
		Self::new(
			FINISHED,
			vec![SignalArg::Bool(success), SignalArg::Str(message.into())],
		)
	}

	pub fn percent_progress(text: impl Into<String>, percentage: u32) -> Self {
		Self::new(
			PERCENT_PROGRESS,
			vec![SignalArg::Str(text.into()), SignalArg::U32(percentage)],
		)
	}

	/// Signature of the arguments, `(bs)` style.
	#[must_use]
	pub fn signature(&self) -> String {
		let mut signature = String::with_capacity(self.args.len() + 2);
		signature.push('(');
		for arg in &self.args {
			signature.push_str(&arg.to_string());
		}
		signature.push(')');

		signature
	}

	/// Interprets the signal.
	///
	/// A completion notification with unexpected arguments is a protocol violation, a progress
	/// notification with unexpected arguments is only worth ignoring.
	pub fn decode(&self) -> Result<Notification, Error> {
		match (self.member.as_str(), self.args.as_slice()) {
			(FINISHED, [SignalArg::Bool(success), SignalArg::Str(message)]) => {
				Ok(Notification::Finished {
					success: *success,
					message: message.clone(),
				})
			}

			(FINISHED, _) => Err(Error::ProtocolViolation(format!(
				"expected `Finished` arguments of type (bs), got {}",
				self.signature()
			))),

			(PERCENT_PROGRESS, [SignalArg::Str(text), SignalArg::U32(percentage)]) => {
				Ok(Notification::PercentProgress {
					text: text.clone(),
					percentage: *percentage,
				})
			}

			(member, _) => Ok(Notification::Other(member.to_string())),
		}
	}
}
