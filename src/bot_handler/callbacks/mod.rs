pub mod admin;
pub mod book_search;
pub mod chat;
pub mod library;
pub mod menu;
pub mod subscriptions;

use crate::bot_handler::{BotHandlerResult, CallbackAction, Context};

/// Dispatches a button press. Admin access is checked by the caller.
pub async fn handle(ctx: Context<'_>, action: CallbackAction) -> BotHandlerResult<()> {
    use CallbackAction::*;

    tracing::debug!("Callback {action:?} from {}", ctx.chat_id());

    match action {
        Menu => menu::handle_menu(ctx).await,
        Help => menu::handle_help(ctx).await,
        Games => menu::handle_games(ctx).await,

        Library(page) => library::handle_list(ctx, page).await,
        BookOptions(book_id) => library::handle_options(ctx, book_id).await,
        SendBook(book_id) => library::handle_send(ctx, book_id).await,
        DeleteBook(book_id) => library::handle_delete(ctx, book_id).await,

        Subscriptions => subscriptions::handle_overview(ctx).await,
        SubscriptionDetails => subscriptions::handle_details(ctx).await,
        Plans => subscriptions::handle_plans(ctx).await,
        PlanDetails(plan_id) => subscriptions::handle_plan_details(ctx, plan_id).await,
        BuyPlan(plan_id) => subscriptions::handle_buy(ctx, plan_id).await,

        FindBook => book_search::handle_find(ctx).await,
        ChooseLanguage(language) => book_search::handle_language(ctx, language).await,
        ToggleAddon(addon) => book_search::handle_toggle_addon(ctx, addon).await,
        SelectAllAddons => book_search::handle_select_all(ctx).await,
        RemoveAllAddons => book_search::handle_remove_all(ctx).await,
        AddonsDone => book_search::handle_addons_done(ctx).await,

        ChatWithAi => chat::handle_start(ctx).await,

        AdminPanel => admin::handle_panel(ctx).await,
        Statistics => admin::handle_statistics(ctx).await,
        UserManagement => admin::users::handle_menu(ctx).await,
        FindUser => admin::users::handle_find(ctx).await,
        Notifications => admin::notifications::handle_menu(ctx).await,
        Broadcast(audience) => admin::notifications::handle_broadcast(ctx, audience).await,
        DirectMessage => admin::notifications::handle_direct(ctx).await,
        Modes => admin::modes::handle_menu(ctx).await,
        BookSettings => admin::modes::handle_book_settings(ctx).await,
        ChatSettings => admin::modes::handle_chat_settings(ctx).await,
        BookModeInfo => admin::modes::handle_book_info(ctx).await,
        ChatModeInfo => admin::modes::handle_chat_info(ctx).await,
        ToggleBookCheck => admin::modes::handle_toggle_book_check(ctx).await,
        ToggleChatCheck => admin::modes::handle_toggle_chat_check(ctx).await,
        EditSetting(key) => admin::modes::handle_edit_setting(ctx, key).await,
        ManagePlans => admin::plans::handle_menu(ctx).await,
        AddPlan => admin::plans::handle_add(ctx).await,
        RemovePlanList => admin::plans::handle_remove_list(ctx).await,
        RemovePlan(plan_id) => admin::plans::handle_remove(ctx, plan_id).await,
        GiftPlanList => admin::plans::handle_gift_list(ctx).await,
        GiftPlan(plan_id) => admin::plans::handle_gift(ctx, plan_id).await,
    }
}
