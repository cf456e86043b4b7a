//! Skin tone classification from a single photograph.
//!
//! Pipeline: face locator → skin sampler → color reducer → tone classifier.
//! [`pipeline::skin_tone_analyzer::SkinToneAnalyzer`] wires the stages
//! together; the remaining modules are the stages and their adapters.

pub mod classification {
    pub mod rule_table;
    pub mod tone_category;
}

pub mod color {
    pub mod color_reducer;
    pub mod hsv;
    pub mod skin_mask;
}

pub mod detection {
    pub mod domain {
        pub mod face_detector;
        pub mod face_locator;
        pub mod face_selection;
    }
    pub mod infrastructure;
}

pub mod imaging {
    pub mod domain {
        pub mod image_reader;
        pub mod image_writer;
    }
    pub mod infrastructure {
        pub mod image_file_reader;
        pub mod image_file_writer;
    }
}

pub mod overlay {
    pub mod domain {
        pub mod frame_annotator;
    }
    pub mod infrastructure {
        pub mod box_outline_annotator;
    }
}

pub mod pipeline {
    pub mod analyzer_config;
    pub mod batch_executor;
    pub mod classify_image_use_case;
    pub mod pipeline_logger;
    pub mod skin_tone_analyzer;
    pub mod infrastructure {
        pub mod threaded_batch_executor;
    }
}

pub mod sampling {
    pub mod skin_sampler;
}

pub mod shared {
    pub mod cascade_resolver;
    pub mod constants;
    pub mod error;
    pub mod face_box;
    pub mod frame;
    pub mod interval;
}
