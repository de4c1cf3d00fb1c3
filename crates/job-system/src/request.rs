use std::{fmt, time::Duration};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unique identifier for a job using the [`uuid`](https://docs.rs/uuid) crate.
pub type JobId = Uuid;

/// Stable identifier of an app, runtime, repository or operating system.
pub type EntityId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
	Application,
	Runtime,
	OperatingSystem,
	Repository,
}

/// Something a job acts upon.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
	pub id: EntityId,
	pub kind: EntityKind,
	pub name: String,
}

impl Entity {
	pub fn new(id: impl Into<EntityId>, kind: EntityKind, name: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			kind,
			name: name.into(),
		}
	}

	pub fn app(id: impl Into<EntityId>, name: impl Into<String>) -> Self {
		Self::new(id, EntityKind::Application, name)
	}

	pub fn operating_system(id: impl Into<EntityId>, name: impl Into<String>) -> Self {
		Self::new(id, EntityKind::OperatingSystem, name)
	}
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum Target {
	#[default]
	Nothing,
	Entity(Entity),
	Entities(Vec<Entity>),
}

impl Target {
	#[must_use]
	pub fn entities(&self) -> &[Entity] {
		match self {
			Self::Nothing => &[],
			Self::Entity(entity) => std::slice::from_ref(entity),
			Self::Entities(entities) => entities,
		}
	}

	#[must_use]
	pub fn contains(&self, entity_id: &str) -> bool {
		self.entities().iter().any(|entity| entity.id == entity_id)
	}
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadUpgradeFlags {
	pub interactive: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeFlags {
	pub interactive: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshMetadataFlags {
	pub interactive: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallFlags {
	pub interactive: bool,
	/// Only apply what was previously downloaded.
	pub no_download: bool,
	/// Only download, leave applying for later.
	pub no_apply: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UninstallFlags {
	pub interactive: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateFlags {
	pub interactive: bool,
	pub no_download: bool,
	pub no_apply: bool,
}

/// What kind of work a job asks backends to do, used for capability queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
	DownloadUpgrade,
	TriggerUpgrade,
	RefreshMetadata,
	InstallApps,
	UninstallApps,
	UpdateApps,
}

impl fmt::Display for OperationKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Self::DownloadUpgrade => "download-upgrade",
			Self::TriggerUpgrade => "trigger-upgrade",
			Self::RefreshMetadata => "refresh-metadata",
			Self::InstallApps => "install-apps",
			Self::UninstallApps => "uninstall-apps",
			Self::UpdateApps => "update-apps",
		};

		f.write_str(s)
	}
}

/// An operation together with its kind specific flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Operation {
	DownloadUpgrade {
		flags: DownloadUpgradeFlags,
	},
	TriggerUpgrade {
		flags: UpgradeFlags,
	},
	RefreshMetadata {
		/// Metadata younger than this is considered fresh enough.
		cache_age: Duration,
		flags: RefreshMetadataFlags,
	},
	InstallApps {
		flags: InstallFlags,
	},
	UninstallApps {
		flags: UninstallFlags,
	},
	UpdateApps {
		flags: UpdateFlags,
	},
}

impl Operation {
	#[must_use]
	pub const fn kind(&self) -> OperationKind {
		match self {
			Self::DownloadUpgrade { .. } => OperationKind::DownloadUpgrade,
			Self::TriggerUpgrade { .. } => OperationKind::TriggerUpgrade,
			Self::RefreshMetadata { .. } => OperationKind::RefreshMetadata,
			Self::InstallApps { .. } => OperationKind::InstallApps,
			Self::UninstallApps { .. } => OperationKind::UninstallApps,
			Self::UpdateApps { .. } => OperationKind::UpdateApps,
		}
	}

	#[must_use]
	pub const fn is_interactive(&self) -> bool {
		match self {
			Self::DownloadUpgrade { flags } => flags.interactive,
			Self::TriggerUpgrade { flags } => flags.interactive,
			Self::RefreshMetadata { flags, .. } => flags.interactive,
			Self::InstallApps { flags } => flags.interactive,
			Self::UninstallApps { flags } => flags.interactive,
			Self::UpdateApps { flags } => flags.interactive,
		}
	}
}

/// One logical operation to be fanned out across backends. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
	id: JobId,
	operation: Operation,
	target: Target,
	created_at: DateTime<Utc>,
}

impl Request {
	#[must_use]
	pub fn new(operation: Operation, target: Target) -> Self {
		Self {
			id: JobId::new_v4(),
			operation,
			target,
			created_at: Utc::now(),
		}
	}

	#[must_use]
	pub fn download_upgrade(os: Entity, flags: DownloadUpgradeFlags) -> Self {
		Self::new(Operation::DownloadUpgrade { flags }, Target::Entity(os))
	}

	#[must_use]
	pub fn refresh_metadata(cache_age: Duration, flags: RefreshMetadataFlags) -> Self {
		Self::new(
			Operation::RefreshMetadata { cache_age, flags },
			Target::Nothing,
		)
	}

	#[must_use]
	pub fn update_apps(apps: Vec<Entity>, flags: UpdateFlags) -> Self {
		Self::new(Operation::UpdateApps { flags }, Target::Entities(apps))
	}

	#[must_use]
	pub const fn id(&self) -> JobId {
		self.id
	}

	#[must_use]
	pub const fn operation(&self) -> &Operation {
		&self.operation
	}

	#[must_use]
	pub const fn kind(&self) -> OperationKind {
		self.operation.kind()
	}

	#[must_use]
	pub const fn target(&self) -> &Target {
		&self.target
	}

	/// The first entity targeted, if any.
	#[must_use]
	pub fn entity(&self) -> Option<&Entity> {
		self.target.entities().first()
	}

	#[must_use]
	pub const fn created_at(&self) -> DateTime<Utc> {
		self.created_at
	}
}
