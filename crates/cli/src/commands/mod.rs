/*!
 * Copyright 2025 imgproxy stack contributors
 * Licensed under the Elastic License 2.0; you may not use this file except in compliance with the Elastic License 2.0.
 * See the LICENSE file in the project root for details.
 *
 * CLI commands
 */

pub mod completion;
pub mod generate;
