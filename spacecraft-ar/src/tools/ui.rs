use bevy::prelude::*;
use crate::tools::action_bus::{ActionBus, ActionEvent};

const BAR_BACKGROUND: Color = Color::srgba(0.10, 0.11, 0.13, 0.85);
const BUTTON_IDLE: Color = Color::srgb(0.22, 0.24, 0.28);
const BUTTON_HOVER: Color = Color::srgb(0.26, 0.28, 0.32);
const BUTTON_PRESSED: Color = Color::srgb(0.18, 0.20, 0.24);
const CLEAR_IDLE: Color = Color::srgb(0.28, 0.10, 0.10);
const CLEAR_HOVER: Color = Color::srgb(0.34, 0.14, 0.14);
const CLEAR_PRESSED: Color = Color::srgb(0.20, 0.12, 0.12);

#[derive(Component)]
pub struct ActionBar;

/// Button publishing its action on the bus when pressed.
#[derive(Component, Debug, Clone, Copy)]
pub struct ActionButton(pub ActionEvent);

fn palette(action: ActionEvent) -> (Color, Color, Color) {
    match action {
        ActionEvent::RemoveAllAnchors => (CLEAR_IDLE, CLEAR_HOVER, CLEAR_PRESSED),
        _ => (BUTTON_IDLE, BUTTON_HOVER, BUTTON_PRESSED),
    }
}

// Spawns the bottom action bar, clear button first
pub fn spawn_action_bar(mut commands: Commands) {
    commands
        .spawn((
            ActionBar,
            Name::new("ActionBar"),
            BackgroundColor(BAR_BACKGROUND),
            Node {
                width: Val::Percent(100.0),
                position_type: PositionType::Absolute,
                bottom: Val::Px(0.0),
                left: Val::Px(0.0),
                padding: UiRect::all(Val::Px(10.0)),
                column_gap: Val::Px(8.0),
                display: Display::Flex,
                flex_direction: FlexDirection::Row,
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                flex_wrap: FlexWrap::Wrap,
                ..default()
            },
        ))
        .with_children(|bar| {
            for action in ActionEvent::ALL {
                let (idle, _, _) = palette(action);
                bar.spawn((
                    Button,
                    ActionButton(action),
                    Name::new(format!("{action:?}Button")),
                    BackgroundColor(idle),
                    Node {
                        min_width: Val::Px(72.0),
                        height: Val::Px(36.0),
                        padding: UiRect::horizontal(Val::Px(10.0)),
                        justify_content: JustifyContent::Center,
                        align_items: AlignItems::Center,
                        ..default()
                    },
                ))
                .with_children(|button| {
                    button.spawn((
                        Text::new(action.label()),
                        TextFont { font_size: 14.0, ..default() },
                        TextColor(Color::srgb(1.0, 1.0, 1.0)),
                    ));
                });
            }
        });
}

// Publishes the button's action on press
pub fn action_button_interaction(
    mut q: Query<(&Interaction, &ActionButton, &mut BackgroundColor), (Changed<Interaction>, With<Button>)>,
    bus: Res<ActionBus>,
) {
    for (interaction, ActionButton(action), mut bg) in &mut q {
        let (idle, hover, pressed) = palette(*action);
        match *interaction {
            Interaction::Pressed => { bus.publish(*action); *bg = BackgroundColor(pressed); }
            Interaction::Hovered => *bg = BackgroundColor(hover),
            Interaction::None    => *bg = BackgroundColor(idle),
        }
    }
}

/// Keyboard action for a key, if any.
pub fn shortcut_action(key: KeyCode) -> Option<ActionEvent> {
    match key {
        KeyCode::Digit1 => Some(ActionEvent::PlaceLunarRover),
        KeyCode::Digit2 => Some(ActionEvent::PlaceLunarLander),
        KeyCode::Digit3 => Some(ActionEvent::PlaceIss),
        KeyCode::Digit4 => Some(ActionEvent::PlaceEarth),
        KeyCode::Digit5 => Some(ActionEvent::PlaceSaturnV),
        KeyCode::Digit6 => Some(ActionEvent::PlaceJwst),
        KeyCode::Digit7 => Some(ActionEvent::PlaceIceSat),
        KeyCode::Delete | KeyCode::Backspace => Some(ActionEvent::RemoveAllAnchors),
        _ => None,
    }
}

pub fn handle_action_shortcuts(keyboard: Res<ButtonInput<KeyCode>>, bus: Res<ActionBus>) {
    for key in keyboard.get_just_pressed() {
        if let Some(action) = shortcut_action(*key) {
            bus.publish(action);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_action_has_a_shortcut() {
        let keys = [
            KeyCode::Digit1,
            KeyCode::Digit2,
            KeyCode::Digit3,
            KeyCode::Digit4,
            KeyCode::Digit5,
            KeyCode::Digit6,
            KeyCode::Digit7,
            KeyCode::Delete,
        ];
        let mapped: Vec<_> = keys.into_iter().filter_map(shortcut_action).collect();
        for action in ActionEvent::ALL {
            assert!(mapped.contains(&action), "{action:?} has no shortcut");
        }
        assert_eq!(shortcut_action(KeyCode::KeyQ), None);
    }
}
