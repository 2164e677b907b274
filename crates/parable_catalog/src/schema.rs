//! Diesel schema for the asset catalog.

diesel::table! {
    stories (id) {
        id -> Integer,
        idiom -> Text,
        story_text -> Text,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    scenes (id) {
        id -> Integer,
        story_id -> Integer,
        scene_text -> Text,
        scene_order -> Integer,
        created_at -> Timestamp,
    }
}

diesel::table! {
    images (id) {
        id -> Integer,
        story_id -> Integer,
        scene_id -> Nullable<Integer>,
        image_path -> Text,
        image_filename -> Text,
        image_size -> BigInt,
        created_at -> Timestamp,
    }
}

diesel::table! {
    audio (id) {
        id -> Integer,
        story_id -> Integer,
        audio_path -> Text,
        audio_filename -> Text,
        audio_size -> BigInt,
        audio_duration -> Nullable<Double>,
        created_at -> Timestamp,
    }
}

diesel::table! {
    videos (id) {
        id -> Integer,
        story_id -> Integer,
        video_path -> Text,
        video_filename -> Text,
        video_size -> BigInt,
        video_duration -> Nullable<Double>,
        created_at -> Timestamp,
    }
}

diesel::joinable!(scenes -> stories (story_id));
diesel::joinable!(images -> stories (story_id));
diesel::joinable!(images -> scenes (scene_id));
diesel::joinable!(audio -> stories (story_id));
diesel::joinable!(videos -> stories (story_id));

diesel::allow_tables_to_appear_in_same_query!(stories, scenes, images, audio, videos);
