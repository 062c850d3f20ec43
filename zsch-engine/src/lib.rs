pub mod block;
pub mod hierarchy;
pub mod registry;
pub mod screen;
pub mod undo;

pub mod errors {
    use thiserror::Error;
    use zsch_core::draw_list::{DrawListError, ItemKey};
    use zsch_core::item::{ItemError, ScreenId};

    #[derive(Debug, Error)]
    pub enum EngineError {
        #[error("{0} not found")]
        ScreenNotFound(ScreenId),
        #[error("item {0} not found")]
        ItemNotFound(ItemKey),
        #[error("undo command `{description}` no longer matches the document and was dropped")]
        InconsistentCommand { description: String },
        #[error("hierarchy exceeds {limit} sheets")]
        TooManySheets { limit: usize },
        #[error(transparent)]
        Item(#[from] ItemError),
        #[error(transparent)]
        DrawList(#[from] DrawListError),
    }
}

/// 编辑会话参数，由应用层根据配置填充。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditSettings {
    /// 撤销栈最大深度，0 表示不限。
    pub max_undo_depth: usize,
    /// 点选与框选的容差（nm）。
    pub hit_accuracy: i32,
}

impl Default for EditSettings {
    fn default() -> Self {
        Self {
            max_undo_depth: 100,
            hit_accuracy: 0,
        }
    }
}

pub use errors::EngineError;
pub use hierarchy::{Schematic, SheetPath};
pub use registry::SheetRegistry;
pub use screen::Screen;
