use serde::{Deserialize, Serialize};

use crate::{
    account::Audience,
    generation::{Addon, BookLanguage},
    settings::SettingKey,
};

/// Payload of an inline keyboard button. Serialized names are kept short so
/// that every action fits into Telegram's 64 byte callback data limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallbackAction {
    #[serde(rename = "m")]
    Menu,
    #[serde(rename = "h")]
    Help,
    #[serde(rename = "g")]
    Games,

    // Library
    #[serde(rename = "l")]
    Library(usize), // page
    #[serde(rename = "lb")]
    BookOptions(i64),
    #[serde(rename = "ls")]
    SendBook(i64),
    #[serde(rename = "ld")]
    DeleteBook(i64),

    // Subscriptions
    #[serde(rename = "s")]
    Subscriptions,
    #[serde(rename = "sd")]
    SubscriptionDetails,
    #[serde(rename = "sp")]
    Plans,
    #[serde(rename = "spv")]
    PlanDetails(i64),
    #[serde(rename = "spb")]
    BuyPlan(i64),

    // Book search
    #[serde(rename = "b")]
    FindBook,
    #[serde(rename = "bl")]
    ChooseLanguage(BookLanguage),
    #[serde(rename = "ba")]
    ToggleAddon(Addon),
    #[serde(rename = "baa")]
    SelectAllAddons,
    #[serde(rename = "bar")]
    RemoveAllAddons,
    #[serde(rename = "bn")]
    AddonsDone,

    // Chat
    #[serde(rename = "c")]
    ChatWithAi,

    // Admin panel
    #[serde(rename = "a")]
    AdminPanel,
    #[serde(rename = "ast")]
    Statistics,
    #[serde(rename = "au")]
    UserManagement,
    #[serde(rename = "auf")]
    FindUser,
    #[serde(rename = "an")]
    Notifications,
    #[serde(rename = "anb")]
    Broadcast(Audience),
    #[serde(rename = "and")]
    DirectMessage,
    #[serde(rename = "am")]
    Modes,
    #[serde(rename = "amb")]
    BookSettings,
    #[serde(rename = "amc")]
    ChatSettings,
    #[serde(rename = "amib")]
    BookModeInfo,
    #[serde(rename = "amic")]
    ChatModeInfo,
    #[serde(rename = "atb")]
    ToggleBookCheck,
    #[serde(rename = "atc")]
    ToggleChatCheck,
    #[serde(rename = "ae")]
    EditSetting(SettingKey),
    #[serde(rename = "ap")]
    ManagePlans,
    #[serde(rename = "apa")]
    AddPlan,
    #[serde(rename = "apr")]
    RemovePlanList,
    #[serde(rename = "aprm")]
    RemovePlan(i64),
    #[serde(rename = "apg")]
    GiftPlanList,
    #[serde(rename = "apgp")]
    GiftPlan(i64),
}

impl CallbackAction {
    /// Actions only administrators may trigger.
    pub fn is_admin_only(&self) -> bool {
        use CallbackAction::*;
        matches!(
            self,
            AdminPanel
                | Statistics
                | UserManagement
                | FindUser
                | Notifications
                | Broadcast(_)
                | DirectMessage
                | Modes
                | BookSettings
                | ChatSettings
                | BookModeInfo
                | ChatModeInfo
                | ToggleBookCheck
                | ToggleChatCheck
                | EditSetting(_)
                | ManagePlans
                | AddPlan
                | RemovePlanList
                | RemovePlan(_)
                | GiftPlanList
                | GiftPlan(_)
        )
    }
}
